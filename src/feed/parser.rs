use crate::feed::ids::{article_id, next_parse_stamp};
use crate::feed::Article;
use chrono::{SecondsFormat, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

pub const UNTITLED: &str = "Untitled";
pub const NO_DESCRIPTION: &str = "No description.";
pub const NO_CONTENT: &str = "No content available.";

/// Turns feed markup into article candidates.
///
/// Parsing never fails. Every `item` element found in the document becomes an
/// article, in document order, and each field falls back to its own default
/// when the element is missing or empty. On an XML syntax error the item being
/// read keeps what it gathered and parsing resumes at the next `item` start
/// tag, so one broken item does not cost the rest of the feed.
/// `feed_id` is left blank for the caller to stamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"pubDate" => Some(Field::PubDate),
            _ => None,
        }
    }
}

struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Debug, Default)]
struct ItemDraft {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
    image: Option<String>,
    enclosure_seen: bool,
}

impl ItemDraft {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
        }
    }

    /// Only the first matching element counts, even when its text is empty.
    fn store(&mut self, capture: Capture) {
        let slot = self.slot(capture.field);
        if slot.is_none() {
            *slot = Some(capture.text);
        }
    }

    fn wants(&mut self, field: Field) -> bool {
        self.slot(field).is_none()
    }

    fn into_article(self, id: String, now: &str) -> Article {
        let description = non_empty(self.description);

        Article {
            id,
            feed_id: String::new(),
            title: non_empty(self.title).unwrap_or_else(|| UNTITLED.to_string()),
            link: non_empty(self.link).unwrap_or_default(),
            description: description
                .clone()
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            pub_date: non_empty(self.pub_date).unwrap_or_else(|| now.to_string()),
            image: Some(non_empty(self.image).unwrap_or_default()),
            content: Some(description.unwrap_or_else(|| NO_CONTENT.to_string())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl MarkupParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, markup: &str) -> Vec<Article> {
        self.parse_with_stamp(markup, next_parse_stamp())
    }

    /// Same as [`MarkupParser::parse`] with an explicit id stamp.
    pub fn parse_with_stamp(&self, markup: &str, stamp: u64) -> Vec<Article> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let drafts = collect_items(markup);

        debug!("Parsed {} items from {} bytes of markup", drafts.len(), markup.len());

        drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| draft.into_article(article_id(stamp, index), &now))
            .collect()
    }
}

fn collect_items(markup: &str) -> Vec<ItemDraft> {
    let mut items = Vec::new();
    let mut offset = 0;

    while let Some(error_at) = scan_items(&markup[offset..], &mut items) {
        let resume = offset + error_at.max(1);
        match next_item_start(markup, resume) {
            Some(next) => {
                debug!("Resuming after malformed markup at byte {}", next);
                offset = next;
            }
            None => break,
        }
    }

    items
}

/// Reads items from `markup` into `items`. Returns the byte position of the
/// first syntax error, or `None` when the end of input was reached.
fn scan_items(markup: &str, items: &mut Vec<ItemDraft>) -> Option<usize> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut current: Option<ItemDraft> = None;
    let mut item_depth = 0;
    let mut capture: Option<Capture> = None;
    let mut depth = 0usize;
    let mut error_at = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                if name.as_ref() == b"item" {
                    // Items never nest, so this one closes an item left open
                    // by broken markup.
                    if let Some(draft) = finish_draft(current.take(), capture.take()) {
                        items.push(draft);
                    }
                    current = Some(ItemDraft::default());
                    item_depth = depth;
                } else if capture.is_none() {
                    if let Some(draft) = current.as_mut() {
                        if let Some(field) = Field::from_name(name.as_ref()) {
                            if draft.wants(field) {
                                capture = Some(Capture {
                                    field,
                                    depth,
                                    text: String::new(),
                                });
                            }
                        } else if name.as_ref() == b"enclosure" {
                            read_enclosure(draft, &e, &reader);
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if let Some(draft) = current.as_mut() {
                    if capture.is_none() {
                        if let Some(field) = Field::from_name(name.as_ref()) {
                            if draft.wants(field) {
                                *draft.slot(field) = Some(String::new());
                            }
                        } else if name.as_ref() == b"enclosure" {
                            read_enclosure(draft, &e, &reader);
                        }
                    }
                } else if name.as_ref() == b"item" {
                    items.push(ItemDraft::default());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(capture) = capture.as_mut() {
                    match e.unescape() {
                        Ok(text) => capture.text.push_str(&text),
                        Err(_) => capture.text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                if capture.as_ref().map_or(false, |c| c.depth == depth) {
                    if let (Some(draft), Some(done)) = (current.as_mut(), capture.take()) {
                        draft.store(done);
                    }
                }
                if current.is_some() && depth == item_depth {
                    if let Some(draft) = current.take() {
                        items.push(draft);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                let position = usize::try_from(reader.buffer_position()).unwrap_or(markup.len());
                warn!("Skipping malformed markup (position {}): {}", position, e);
                error_at = Some(position);
                break;
            }
            _ => {}
        }
    }

    // Keep whatever an unterminated item had gathered.
    if let Some(draft) = finish_draft(current, capture) {
        items.push(draft);
    }

    error_at
}

fn finish_draft(draft: Option<ItemDraft>, capture: Option<Capture>) -> Option<ItemDraft> {
    let mut draft = draft?;
    if let Some(done) = capture {
        draft.store(done);
    }
    Some(draft)
}

/// Byte offset of the first `<item` start tag (any prefix) at or after `from`.
fn next_item_start(markup: &str, from: usize) -> Option<usize> {
    markup
        .match_indices('<')
        .map(|(index, _)| index)
        .filter(|&index| index >= from)
        .find(|&index| {
            let name: String = markup[index + 1..]
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
                .collect();
            name.rsplit(':').next() == Some("item")
        })
}

fn read_enclosure(draft: &mut ItemDraft, element: &BytesStart<'_>, reader: &Reader<&[u8]>) {
    if draft.enclosure_seen {
        return;
    }
    draft.enclosure_seen = true;

    for attr in element.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"url" {
            match attr.decode_and_unescape_value(reader.decoder()) {
                Ok(value) => draft.image = Some(value.into_owned()),
                Err(e) => warn!("Ignoring undecodable enclosure url: {}", e),
            }
            return;
        }
    }
}
