//! Maps proxy requests to responses.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use hyper::{Method, Response, StatusCode};
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::path::{ModuleQuery, Operation, parse_request};
use crate::store::{self, ModuleSource};
use crate::zip::ZipPackager;

const TEXT_PLAIN: &str = "text/plain";
const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const APPLICATION_ZIP: &str = "application/zip";

/// Answers module proxy requests from a [`ModuleSource`].
pub struct Router<S> {
    source: S,
    packager: ZipPackager,
}

impl<S: ModuleSource> Router<S> {
    pub fn new(source: S, packager: ZipPackager) -> Self {
        Self { source, packager }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Produce the response for a request.
    ///
    /// Only GET and HEAD are served; anything else is a `400`. Every parse or
    /// lookup failure is a `404` whose body names the error. HEAD responses
    /// carry the GET headers with an empty body.
    pub async fn respond(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        if method != Method::GET && method != Method::HEAD {
            debug!(%method, path, "rejected method");
            return status_response(StatusCode::BAD_REQUEST);
        }

        let response = match parse_request(path) {
            Ok(query) => match self.dispatch(&query).await {
                Ok((content_type, body)) => {
                    debug!(%query, bytes = body.len(), "served");
                    body_response(StatusCode::OK, content_type, body)
                }
                Err(err) => {
                    debug!(%query, %err, "request failed");
                    error_response(StatusCode::NOT_FOUND, &err)
                }
            },
            Err(err) => {
                debug!(path, %err, "bad request path");
                error_response(StatusCode::NOT_FOUND, &err)
            }
        };

        if method == Method::HEAD {
            let (parts, _) = response.into_parts();
            return Response::from_parts(parts, Full::new(Bytes::new()));
        }
        response
    }

    async fn dispatch(&self, query: &ModuleQuery) -> Result<(&'static str, Vec<u8>)> {
        let module = query.module.as_str();
        match &query.op {
            Operation::Latest => Err(ProxyError::LatestUnsupported),
            Operation::List => {
                let versions = self.source.list(module).await?;
                let mut body = String::new();
                for v in versions {
                    body.push_str(&v);
                    body.push('\n');
                }
                Ok((TEXT_PLAIN, body.into_bytes()))
            }
            Operation::Info(version) => {
                let info = self.source.info(module, version).await?;
                Ok((APPLICATION_JSON, serde_json::to_vec(&info)?))
            }
            Operation::Mod(version) => {
                let release = self.source.load(module, version).await?;
                Ok((TEXT_PLAIN, store::module_file(&release.archive, module)))
            }
            Operation::Zip(version) => {
                let release = self.source.load(module, version).await?;
                let zip = self.packager.pack(module, version, &release.archive)?;
                Ok((APPLICATION_ZIP, zip))
            }
        }
    }
}

fn body_response(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response<Full<Bytes>> {
    let len = body.len();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    response
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// A response whose body is just the status text, e.g. `Bad Request`.
fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    body_response(status, TEXT_PLAIN_UTF8, reason(status).as_bytes().to_vec())
}

/// A response whose body is `<status text>: <error>`.
fn error_response(status: StatusCode, err: &ProxyError) -> Response<Full<Bytes>> {
    let body = format!("{}: {err}", reason(status));
    body_response(status, TEXT_PLAIN_UTF8, body.into_bytes())
}
