use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::domain::{ProxyError, ProxyMethod, RequestHead, Result};

/// Read a request line and its headers, up to and including the blank line.
///
/// Returns `Ok(None)` when the peer closes before sending anything. Bytes the
/// reader buffered past the head are left in the reader.
pub async fn read_request_head<R>(reader: &mut R, max_size: usize) -> Result<Option<RequestHead>>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::new();
    let mut started = false;
    let mut header_lines = 0usize;

    loop {
        let start = raw.len();
        let remaining = max_size.saturating_sub(start);
        if remaining == 0 {
            return Err(ProxyError::HeadTooLarge(max_size));
        }

        let n = (&mut *reader).take(remaining as u64).read_until(b'\n', &mut raw).await?;
        if n == 0 {
            if raw.is_empty() {
                return Ok(None);
            }
            return Err(ProxyError::InvalidRequest("connection closed inside request head".to_string()));
        }
        if raw.last() != Some(&b'\n') {
            if raw.len() >= max_size {
                return Err(ProxyError::HeadTooLarge(max_size));
            }
            return Err(ProxyError::InvalidRequest("connection closed inside request head".to_string()));
        }

        let blank = matches!(&raw[start..], b"\n" | b"\r\n");
        if !started {
            // Stray CRLFs before the request line are ignored.
            started = !blank;
        } else if blank {
            break;
        } else {
            header_lines += 1;
        }
    }

    parse_head(raw, header_lines).map(Some)
}

fn parse_head(raw: Vec<u8>, header_lines: usize) -> Result<RequestHead> {
    let mut parsed_headers = vec![httparse::EMPTY_HEADER; header_lines];
    let mut request = httparse::Request::new(&mut parsed_headers);
    match request.parse(&raw) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => {
            return Err(ProxyError::InvalidRequest("incomplete request head".to_string()));
        }
        Err(e) => return Err(ProxyError::InvalidRequest(format!("malformed request head: {}", e))),
    }

    let (method, target, version) = match (request.method, request.path, request.version) {
        (Some(method), Some(target), Some(minor)) => {
            (ProxyMethod::from(method), target.to_string(), format!("HTTP/1.{}", minor))
        }
        _ => return Err(ProxyError::InvalidRequest("missing request line".to_string())),
    };

    // Values may carry obs-text; the raw bytes are what gets forwarded.
    let headers = request
        .headers
        .iter()
        .map(|header| {
            (
                header.name.to_string(),
                String::from_utf8_lossy(header.value).trim().to_string(),
            )
        })
        .collect();

    Ok(RequestHead {
        method,
        target,
        version,
        headers,
        raw,
    })
}
