// Demonstration resource tree served by the binary
//
//   /            index page
//   /notes       note collection (GET html|json, POST json)
//   /notes/{id}  one note (GET html|json, DELETE)
//   /latest      delegates to the newest note
//   /countdown   streamed plain text
//   /echo/...    nested app reporting where it was mounted

use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, LINK};
use hyper::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock, RwLock};

use restwalk::dispatch::MethodTable;
use restwalk::error::{ClientError, Error, ServerError};
use restwalk::handler::{App, Mount};
use restwalk::http::{response, Body, Request, Response};
use restwalk::templating::{self, Args, Templating};
use restwalk::traversal::{Child, HandlerResult, Resource, Respond, Segments, Traverse};

const JSON: &str = "application/json";

#[derive(Debug, Clone, Serialize)]
struct Note {
    id: u64,
    title: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct NewNote {
    title: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Default)]
struct Shelf {
    notes: Vec<Note>,
    /// Highest id ever handed out; ids of deleted notes are never reused
    last_id: u64,
}

/// In-memory note storage shared by every resource of the site
#[derive(Debug, Default)]
pub struct NoteStore {
    shelf: RwLock<Shelf>,
}

impl NoteStore {
    fn read<T>(&self, f: impl FnOnce(&[Note]) -> T) -> Result<T, Error> {
        let shelf = self
            .shelf
            .read()
            .map_err(|_| ServerError::internal().with_message("note store poisoned"))?;
        Ok(f(&shelf.notes))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Shelf) -> T) -> Result<T, Error> {
        let mut shelf = self
            .shelf
            .write()
            .map_err(|_| ServerError::internal().with_message("note store poisoned"))?;
        Ok(f(&mut shelf))
    }

    fn insert(&self, new: NewNote) -> Result<Note, Error> {
        self.write(|shelf| {
            shelf.last_id += 1;
            let note = Note {
                id: shelf.last_id,
                title: new.title,
                body: new.body,
            };
            shelf.notes.push(note.clone());
            note
        })
    }

    fn get(&self, id: u64) -> Result<Option<Note>, Error> {
        self.read(|notes| notes.iter().find(|n| n.id == id).cloned())
    }
}

/// Build the site's root resource around `store`
pub fn root(store: Arc<NoteStore>) -> Resource {
    Resource::node(Root { store })
}

/// Serialize `value` into a 200 JSON response
fn json_response<T: Serialize>(value: &T) -> Result<HandlerResult, Error> {
    let body = serde_json::to_vec_pretty(value).map_err(Error::other)?;
    Ok(response::ok(JSON, body).into())
}

fn no_headers() -> Vec<(HeaderName, HeaderValue)> {
    Vec::new()
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(Error::other)
}

struct Root {
    store: Arc<NoteStore>,
}

impl Traverse for Root {
    fn resolve_child(&self, _request: &Request, segments: &Segments) -> Result<Option<Child>, Error> {
        let Some((name, rest)) = segments.split_first() else {
            return Ok(None);
        };
        let child = match name {
            "notes" => Resource::node(Notes {
                store: Arc::clone(&self.store),
            }),
            "latest" => {
                let store = Arc::clone(&self.store);
                Resource::from_fn(move |_request| {
                    let newest = store.read(|notes| notes.last().map(|n| n.id))?;
                    match newest {
                        Some(id) => Ok(HandlerResult::Delegate(Resource::invocable(NoteResource {
                            store: Arc::clone(&store),
                            id,
                        }))),
                        None => Err(ClientError::not_found().into()),
                    }
                })
            }
            "countdown" => Resource::from_fn(countdown),
            "echo" => Mount::resource(App::new(Resource::from_fn(echo))),
            _ => return Ok(None),
        };
        Ok(Some((child, rest)))
    }
}

impl Respond for Root {
    fn respond(&self, request: &Request) -> Result<HandlerResult, Error> {
        let count = self.store.read(<[Note]>::len)?;
        let page = json!({ "title": "restwalk", "notes": count });
        let link = HeaderValue::from_static("</notes>; rel=\"collection\"");
        Ok(templating::page_response(request, &page, "index", None, [(LINK, link)])?.into())
    }
}

struct Notes {
    store: Arc<NoteStore>,
}

impl Notes {
    fn table() -> &'static MethodTable<Self> {
        static TABLE: OnceLock<MethodTable<Notes>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::builder()
                .register(Method::GET, "html", Self::html)
                .register(Method::GET, "json", Self::json)
                .register_consuming(Method::POST, "json", "json", Self::create)
                .build()
        })
    }

    fn html(&self, request: &Request) -> Result<HandlerResult, Error> {
        let notes = self.store.read(<[Note]>::to_vec)?;
        let page = json!({ "title": "Notes", "notes": to_value(&notes)? });
        Ok(templating::page_response(request, &page, "notes", None, no_headers())?.into())
    }

    fn json(&self, _request: &Request) -> Result<HandlerResult, Error> {
        let notes = self.store.read(<[Note]>::to_vec)?;
        json_response(&notes)
    }

    fn create(&self, request: &Request) -> Result<HandlerResult, Error> {
        let new: NewNote = serde_json::from_slice(request.body())
            .map_err(|e| ClientError::bad_request().with_body(format!("invalid note: {e}")))?;
        if new.title.trim().is_empty() {
            return Err(ClientError::bad_request().with_body("title must not be empty").into());
        }
        let note = self.store.insert(new)?;
        let body = serde_json::to_vec_pretty(&note).map_err(Error::other)?;
        let location = format!("{}/notes/{}", request.mount_path(), note.id);
        Ok(response::created(&location, JSON, body).into())
    }
}

impl Traverse for Notes {
    fn resolve_child(&self, _request: &Request, segments: &Segments) -> Result<Option<Child>, Error> {
        let Some((name, rest)) = segments.split_first() else {
            return Ok(None);
        };
        let Ok(id) = name.parse::<u64>() else {
            return Ok(None);
        };
        if self.store.get(id)?.is_none() {
            return Ok(None);
        }
        let note = NoteResource {
            store: Arc::clone(&self.store),
            id,
        };
        Ok(Some((Resource::invocable(note), rest)))
    }
}

impl Respond for Notes {
    fn respond(&self, request: &Request) -> Result<HandlerResult, Error> {
        Self::table().dispatch(self, request)
    }
}

struct NoteResource {
    store: Arc<NoteStore>,
    id: u64,
}

impl NoteResource {
    fn table() -> &'static MethodTable<Self> {
        static TABLE: OnceLock<MethodTable<NoteResource>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::builder()
                .register(Method::GET, "html", Self::html)
                .register(Method::GET, "json", Self::json)
                .register(Method::DELETE, "*/*", Self::delete)
                .build()
        })
    }

    fn note(&self) -> Result<Note, Error> {
        self.store
            .get(self.id)?
            .ok_or_else(|| ClientError::gone().into())
    }

    fn html(&self, request: &Request) -> Result<HandlerResult, Error> {
        let page = to_value(&self.note()?)?;
        Ok(templating::page_response(request, &page, "note", None, no_headers())?.into())
    }

    fn json(&self, _request: &Request) -> Result<HandlerResult, Error> {
        json_response(&self.note()?)
    }

    fn delete(&self, _request: &Request) -> Result<HandlerResult, Error> {
        let id = self.id;
        let removed = self.store.write(|shelf| {
            let before = shelf.notes.len();
            shelf.notes.retain(|n| n.id != id);
            before != shelf.notes.len()
        })?;
        if removed {
            Ok(response::no_content().into())
        } else {
            Err(ClientError::gone().into())
        }
    }
}

impl Respond for NoteResource {
    fn respond(&self, request: &Request) -> Result<HandlerResult, Error> {
        Self::table().dispatch(self, request)
    }
}

#[allow(clippy::unnecessary_wraps)]
fn countdown(_request: &Request) -> Result<HandlerResult, Error> {
    let lines = (0..=10u32)
        .rev()
        .map(|n| Ok(Bytes::from(format!("{n}\n"))));
    Ok(Response::new(hyper::StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .with_body(Body::from_generator(lines))
        .into())
}

/// Plain-text report of the mount point and path a nested app sees
#[allow(clippy::unnecessary_wraps)]
fn echo(request: &Request) -> Result<HandlerResult, Error> {
    let report = format!(
        "mount: {}\npath: {}\n",
        request.mount_path(),
        request.remaining()
    );
    Ok(response::ok("text/plain; charset=utf-8", report).into())
}

/// Minimal HTML renderer for the demo templates
pub struct Pages;

impl Pages {
    fn layout(title: &str, content: &str, args: &Args) -> String {
        let root = args
            .get("urls")
            .and_then(|urls| urls.get("root"))
            .and_then(Value::as_str)
            .unwrap_or("/");
        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body><p><a href=\"{}\">home</a></p>\n{content}</body></html>\n",
            escape(title),
            escape(root),
        )
    }
}

impl Templating for Pages {
    fn render_template(&self, template: &str, args: &Args, _encoding: Option<&str>) -> Result<Bytes, Error> {
        let element = args.get("element").cloned().unwrap_or(Value::Null);
        let text = |key: &str| element.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

        let html = match template {
            "index" => {
                let count = element.get("notes").and_then(Value::as_u64).unwrap_or(0);
                Self::layout(
                    &text("title"),
                    &format!("<h1>{}</h1>\n<p><a href=\"notes\">{count} note(s)</a></p>\n", escape(&text("title"))),
                    args,
                )
            }
            "notes" => {
                let items: String = element
                    .get("notes")
                    .and_then(Value::as_array)
                    .map(|notes| {
                        notes
                            .iter()
                            .map(|n| {
                                let id = n.get("id").and_then(Value::as_u64).unwrap_or(0);
                                let title = n.get("title").and_then(Value::as_str).unwrap_or_default();
                                format!("<li><a href=\"notes/{id}\">{}</a></li>\n", escape(title))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Self::layout("Notes", &format!("<h1>Notes</h1>\n<ul>\n{items}</ul>\n"), args)
            }
            "note" => Self::layout(
                &text("title"),
                &format!("<h1>{}</h1>\n<p>{}</p>\n", escape(&text("title")), escape(&text("body"))),
                args,
            ),
            other => {
                return Err(ServerError::internal()
                    .with_message(format!("unknown template '{other}'"))
                    .into())
            }
        };
        Ok(Bytes::from(html))
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
