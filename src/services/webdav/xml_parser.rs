use std::str;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use url::Url;

use crate::errors::{Result, TransferError};
use crate::path::RemotePath;

/// One entry of a PROPFIND multistatus response, relative to the WebDAV
/// root. Collections carry no size.
#[derive(Debug, Clone)]
pub struct RemoteResource {
    pub relative_path: RemotePath,
    pub parent: RemotePath,
    pub name: String,
    pub is_collection: bool,
    pub size: Option<u64>,
}

#[derive(Debug, Default)]
struct ResponseState {
    href: String,
    content_length: Option<u64>,
    is_collection: bool,
}

/// Parses a 207 multistatus body into the resources it describes.
///
/// The entry whose href denotes `requested` itself is excluded, so a
/// depth-1 listing yields exactly the immediate children. Absent
/// properties default to a plain file of unknown size; malformed XML is a
/// protocol error, never a panic.
pub fn parse_propfind_response(
    xml_text: &str,
    requested: &RemotePath,
    webdav_path: &str,
) -> Result<Vec<RemoteResource>> {
    let mut reader = Reader::from_str(xml_text);
    reader.config_mut().trim_text(true);

    let mut resources = Vec::new();
    let mut current: Option<ResponseState> = None;
    let mut current_element = String::new();
    let mut in_resourcetype = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e)?;

                match name.as_str() {
                    "response" => {
                        current = Some(ResponseState::default());
                    }
                    "resourcetype" => {
                        in_resourcetype = true;
                    }
                    "collection" if in_resourcetype => {
                        if let Some(ref mut resp) = current {
                            resp.is_collection = true;
                        }
                    }
                    _ => {
                        current_element = name;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e)?;

                match name.as_str() {
                    "collection" if in_resourcetype => {
                        if let Some(ref mut resp) = current {
                            resp.is_collection = true;
                        }
                    }
                    // A self-closing <resourcetype/> denotes a plain file;
                    // it has no children and gets no End event, so the flag
                    // must stay untouched.
                    "resourcetype" | "response" => {}
                    _ => {
                        current_element = name;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| TransferError::Protocol {
                        details: format!("Invalid XML text content: {}", e),
                    })?
                    .to_string();

                if let Some(ref mut resp) = current {
                    match current_element.as_str() {
                        "href" => {
                            resp.href = text.trim().to_string();
                        }
                        "getcontentlength" => {
                            resp.content_length = text.trim().parse().ok();
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name_from_end(&e)?;

                match name.as_str() {
                    "response" => {
                        if let Some(resp) = current.take() {
                            if let Some(resource) =
                                resource_from_response(resp, requested, webdav_path)
                            {
                                resources.push(resource);
                            }
                        }
                    }
                    "resourcetype" => {
                        in_resourcetype = false;
                    }
                    _ => {}
                }

                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TransferError::Protocol {
                    details: format!("XML parsing error: {}", e),
                })
            }
            _ => {}
        }

        buf.clear();
    }

    Ok(resources)
}

/// Maps one parsed `<response>` to a resource, or None for the requested
/// folder's own entry and entries without a usable href.
fn resource_from_response(
    resp: ResponseState,
    requested: &RemotePath,
    webdav_path: &str,
) -> Option<RemoteResource> {
    if resp.href.is_empty() {
        return None;
    }

    let relative = href_to_relative_path(&resp.href, webdav_path);
    if relative.is_root() || relative == *requested {
        return None;
    }

    let (parent, name) = relative.parent_and_name();
    let name = name.to_string();

    Some(RemoteResource {
        size: if resp.is_collection {
            None
        } else {
            resp.content_length
        },
        relative_path: relative,
        parent,
        name,
        is_collection: resp.is_collection,
    })
}

/// Converts an href from a multistatus body (absolute URL or URL path,
/// possibly percent-encoded) to a path relative to the WebDAV root.
pub fn href_to_relative_path(href: &str, webdav_path: &str) -> RemotePath {
    // Servers may return full URLs; reduce to the path component first.
    let path_part = if href.starts_with("http://") || href.starts_with("https://") {
        match Url::parse(href) {
            Ok(url) => url.path().to_string(),
            Err(_) => href.to_string(),
        }
    } else {
        href.to_string()
    };

    let decoded = urlencoding::decode(&path_part)
        .map(|s| s.into_owned())
        .unwrap_or(path_part);

    // Strip the mount prefix to get a path relative to the WebDAV root.
    let mount = webdav_path.trim_matches('/');
    let decoded_trimmed = decoded.trim_matches('/');
    let relative = match decoded_trimmed.strip_prefix(mount) {
        _ if mount.is_empty() => decoded_trimmed,
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => match decoded_trimmed.find(&format!("{}/", mount)) {
            Some(idx) => &decoded_trimmed[idx + mount.len()..],
            None => decoded_trimmed,
        },
    };

    RemotePath::new(relative)
}

fn local_name(e: &BytesStart) -> Result<String> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref()).map_err(|e| TransferError::Protocol {
        details: format!("Invalid UTF-8 in element name: {}", e),
    })?;
    Ok(name.to_string())
}

fn local_name_from_end(e: &BytesEnd) -> Result<String> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref()).map_err(|e| TransferError::Protocol {
        details: format!("Invalid UTF-8 in element name: {}", e),
    })?;
    Ok(name.to_string())
}
