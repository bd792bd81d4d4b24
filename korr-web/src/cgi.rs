use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use std::net::SocketAddr;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Environment passed to a CGI script, per spec.md §6's "standard CGI
/// environment variables" list and `webserv.c`'s `setenv` calls.
pub struct CgiRequest<'a> {
    pub method: &'a Method,
    pub request_uri: &'a str,
    pub query_string: Option<&'a str>,
    pub server_protocol: &'a str,
    pub remote_addr: SocketAddr,
    pub document_root: &'a Path,
    pub headers: &'a HeaderMap,
    pub body: Bytes,
}

fn header_env(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(ToString::to_string)
}

/// Run `script` as `/bin/sh -c <script>`, with the request body piped
/// to stdin and its stdout captured whole as the response body.
pub async fn run(script: &Path, req: CgiRequest<'_>) -> std::io::Result<Vec<u8>> {
    let mut command = Command::new("/bin/sh");
    command
        .arg("-c")
        .arg(script.as_os_str())
        .env("CLIENT_PROTOCOL", "HTTP")
        .env("GATEWAY_INTERFACE", "CGI/1.1")
        .env("SERVER_PROTOCOL", req.server_protocol)
        .env("REQUEST_METHOD", req.method.as_str())
        .env("REQUEST_URI", req.request_uri)
        .env("DOCUMENT_URI", req.request_uri)
        .env("DOCUMENT_URL", req.request_uri)
        .env("URI", req.request_uri)
        .env("URL", req.request_uri)
        .env("DOCUMENT_ROOT", req.document_root)
        .env("REMOTE_ADDR", req.remote_addr.ip().to_string())
        .env("REMOTE_PORT", req.remote_addr.port().to_string())
        .env("CONTENT_LENGTH", req.body.len().to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    if let Some(query) = req.query_string {
        command.env("QUERY_STRING", query);
    }
    if let Some(content_type) = header_env(req.headers, "content-type") {
        command.env("CONTENT_TYPE", content_type);
    }
    if let Some(accept) = header_env(req.headers, "accept") {
        command.env("HTTP_ACCEPT", accept);
    }
    if let Some(user_agent) = header_env(req.headers, "user-agent") {
        command.env("HTTP_USER_AGENT", user_agent);
    }
    if let Some(cookie) = header_env(req.headers, "cookie") {
        command.env("HTTP_COOKIE", cookie);
    }

    let mut child = command.spawn()?;

    if !req.body.is_empty() {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&req.body).await?;
        }
    } else {
        drop(child.stdin.take());
    }

    let output = child.wait_with_output().await?;
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes as AxBytes;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn runs_a_shell_script_and_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("echo.cgi");
        std::fs::write(&script, "#!/bin/sh\necho -n \"method=$REQUEST_METHOD\"\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let headers = HeaderMap::new();
        let req = CgiRequest {
            method: &Method::GET,
            request_uri: "/echo.cgi",
            query_string: None,
            server_protocol: "HTTP/1.1",
            remote_addr: SocketAddr::from((Ipv4Addr::new(127, 0, 0, 1), 1234)),
            document_root: dir.path(),
            headers: &headers,
            body: AxBytes::new(),
        };

        let output = run(&script, req).await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "method=GET");
    }
}
