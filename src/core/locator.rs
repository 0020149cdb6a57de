use crate::domain::schema::TableMarker;
use crate::utils::error::{EtlError, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;

/// 只在文件開頭找 `<meta charset>`
const META_SNIFF_LEN: usize = 1024;

pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::SelectorError {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Encoding named by a `charset=` parameter, from either a `Content-Type`
/// header or a `<meta>` tag.
pub fn charset_from(text: &str) -> Option<&'static Encoding> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let label = lower[start..].trim_start_matches(['"', '\'', ' ']);
    let end = label
        .find(|c: char| matches!(c, '"' | '\'' | ';' | '>' | '/') || c.is_whitespace())
        .unwrap_or(label.len());
    Encoding::for_label(label[..end].as_bytes())
}

/// Decodes page bytes: BOM, then valid UTF-8, then the charset declared in
/// the page head, then windows-1252 for undeclared legacy pages.
pub fn decode_document(body: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return encoding.decode_with_bom_removal(body).0;
    }
    if let Ok(text) = std::str::from_utf8(body) {
        return Cow::Borrowed(text);
    }

    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_LEN)]);
    let encoding = match charset_from(&head) {
        Some(encoding) if encoding != UTF_8 => encoding,
        _ => WINDOWS_1252,
    };
    tracing::debug!("Page is not UTF-8, decoding as {}", encoding.name());
    encoding.decode_without_bom_handling(body).0
}

pub fn parse_document(body: &[u8]) -> Html {
    Html::parse_document(&decode_document(body))
}

/// Finds the data table by its tag + class marker.
#[derive(Debug, Clone)]
pub struct TableLocator {
    selector: Selector,
}

impl TableLocator {
    pub fn new(marker: &TableMarker) -> Result<Self> {
        Ok(Self {
            selector: parse_selector(&marker.css())?,
        })
    }

    /// 頁面上只預期一個資料表；多於一個時取第一個
    pub fn locate<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&self.selector).next()
    }
}
