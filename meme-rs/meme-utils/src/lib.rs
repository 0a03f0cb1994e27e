use rand::{seq::SliceRandom, thread_rng};

pub mod clipboard;

pub use clipboard::{CLIPBOARD_COMMANDS, find_clipboard, paste};

pub const DEFAULT_FILE_NAME_PREFIX: &str = "meme";
pub const DEFAULT_RANDOM_SUFFIX_LENGTH: usize = 5;
pub const COMPONENT_MAX_LEN: usize = 12;
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone)]
pub struct ImageNameBuilder {
    parts: Vec<String>,
    random_suffix_length: usize,
}

impl ImageNameBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            parts: vec![prefix.into()],
            random_suffix_length: DEFAULT_RANDOM_SUFFIX_LENGTH,
        }
    }

    pub fn with_random_suffix_length(mut self, length: usize) -> Self {
        debug_assert!(length <= SUFFIX_ALPHABET.len());
        self.random_suffix_length = length;
        self
    }

    pub fn push_component(&mut self, value: Option<&str>) {
        if let Some(token) = value.and_then(component_token) {
            self.parts.push(token);
        }
    }

    pub fn build(self) -> ImageNameContext {
        ImageNameContext {
            base: self.parts.join("-"),
            random_suffix_length: self.random_suffix_length,
        }
    }
}

/// File stem for a saved meme: prefix, generator key and captions, then a
/// random suffix so repeated captions never overwrite each other.
#[derive(Debug, Clone)]
pub struct ImageNameContext {
    base: String,
    random_suffix_length: usize,
}

impl ImageNameContext {
    pub fn new<'a>(
        prefix: impl Into<String>,
        components: impl IntoIterator<Item = Option<&'a str>>,
    ) -> Self {
        let mut builder = ImageNameBuilder::new(prefix);
        for component in components {
            builder.push_component(component);
        }
        builder.build()
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn file_stem(&self) -> String {
        if self.random_suffix_length == 0 {
            return self.base.clone();
        }
        format!("{}-{}", self.base, unique_suffix(self.random_suffix_length))
    }
}

pub fn component_token(input: &str) -> Option<String> {
    slugify(input).map(|slug| truncate_component(&slug))
}

pub fn slugify(input: &str) -> Option<String> {
    let mut slug = String::new();
    let mut last_was_separator = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_separator = false;
        } else if !last_was_separator && !slug.is_empty() {
            slug.push('-');
            last_was_separator = true;
        }
    }

    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() { None } else { Some(slug) }
}

pub fn truncate_component(slug: &str) -> String {
    if slug.len() <= COMPONENT_MAX_LEN {
        return slug.to_string();
    }

    let truncated: String = slug.chars().take(COMPONENT_MAX_LEN).collect();
    let trimmed = truncated.trim_end_matches('-').to_string();
    if trimmed.is_empty() {
        truncated
    } else {
        trimmed
    }
}

fn unique_suffix(length: usize) -> String {
    debug_assert!(length <= SUFFIX_ALPHABET.len());
    let mut rng = thread_rng();
    SUFFIX_ALPHABET
        .choose_multiple(&mut rng, length)
        .copied()
        .map(char::from)
        .collect()
}
