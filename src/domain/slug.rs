//! Slug derivation for workspace names.
//!
//! ASCII slugification (`slug` crate) is combined with Chinese transliteration
//! (`pinyin` crate) so a name like “基线对齐” becomes `ji-xian-dui-qi`. Collision
//! handling appends a short suffix taken from the owning entity's id, which keeps
//! the result stable for a given record instead of depending on insertion order.

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;
use uuid::Uuid;

const SHORT_SUFFIX_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Derive a slug for `id` that does not collide according to `is_free`.
///
/// Tries the bare slug first, then `base-<6 hex of id>`, widening the suffix up
/// to the full simple-form id. Names that slugify to nothing fall back to
/// `workspace-<suffix>`.
pub fn slug_with_id_suffix<F>(input: &str, id: Uuid, mut is_free: F) -> Result<String, SlugError>
where
    F: FnMut(&str) -> bool,
{
    let base = match derive_slug(input) {
        Ok(base) => base,
        Err(SlugError::Unrepresentable { .. }) => "workspace".to_string(),
        Err(err) => return Err(err),
    };

    if is_free(&base) {
        return Ok(base);
    }

    let hex = id.simple().to_string();
    let mut width = SHORT_SUFFIX_LEN;
    while width <= hex.len() {
        let candidate = format!("{base}-{}", &hex[..width]);
        if is_free(&candidate) {
            return Ok(candidate);
        }
        width += SHORT_SUFFIX_LEN;
    }

    let candidate = format!("{base}-{hex}");
    if is_free(&candidate) {
        return Ok(candidate);
    }

    Err(SlugError::Exhausted { base })
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}
