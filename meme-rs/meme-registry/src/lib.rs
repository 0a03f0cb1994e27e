use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown generator {name}")]
    UnknownGenerator { name: String },
    #[error("generator name is empty")]
    EmptyName,
    #[error("invalid generator pattern {name:?}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// A remote meme template as understood by memegenerator.net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRecord {
    pub template_id: u32,
    pub generator_name: &'static str,
    pub default_line: Option<&'static str>,
}

impl TemplateRecord {
    pub const fn new(template_id: u32, generator_name: &'static str) -> Self {
        Self {
            template_id,
            generator_name,
            default_line: None,
        }
    }

    pub const fn with_default_line(mut self, line: &'static str) -> Self {
        self.default_line = Some(line);
        self
    }

    /// Display strings a pattern may match besides the canonical key.
    pub fn aliases(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.generator_name).chain(self.default_line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub key: &'static str,
    pub record: TemplateRecord,
}

impl Entry {
    pub const fn new(key: &'static str, record: TemplateRecord) -> Self {
        Self { key, record }
    }

    fn matches(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.key) || self.record.aliases().any(|alias| pattern.is_match(alias))
    }
}

// Keep generators in alphabetical order.
const BUILTIN_ENTRIES: &[Entry] = &[
    Entry::new("A_DODSON", TemplateRecord::new(106375, "Antoine-Dodson")),
    Entry::new("A_DOG", TemplateRecord::new(940, "Advice-Dog")),
    Entry::new("ANTEATER", TemplateRecord::new(41191, "anteater")),
    Entry::new("BUTTHURT_DWELLER", TemplateRecord::new(1438, "Butthurt-Dweller")),
    Entry::new("B_FROG", TemplateRecord::new(1211, "Foul-Bachelorette-Frog")),
    Entry::new("B_FROG2", TemplateRecord::new(1045, "Foul-Bachelor-Frog")),
    Entry::new("C_WOLF", TemplateRecord::new(931, "Courage-Wolf")),
    Entry::new("CREEPER", TemplateRecord::new(173501, "Minecraft-Creeper")),
    Entry::new("G_GRANDPA", TemplateRecord::new(185650, "Grumpy-Grandpa")),
    Entry::new("H_MERMAID", TemplateRecord::new(405224, "Hipster-Mermaid")),
    Entry::new(
        "I_DONT_ALWAYS",
        TemplateRecord::new(38926, "The-Most-Interesting-Man-in-the-World"),
    ),
    Entry::new("I_WOLF", TemplateRecord::new(926, "Insanity-Wolf")),
    Entry::new("J_DUCREUX", TemplateRecord::new(1356, "Joseph-Ducreux")),
    Entry::new("MINECRAFT", TemplateRecord::new(122309, "Minecraft")),
    Entry::new("OBAMA", TemplateRecord::new(1332, "Obama-")),
    Entry::new(
        "O-RLY-OWL",
        TemplateRecord::new(117041, "O-RLY-OWL").with_default_line("ORLY???"),
    ),
    Entry::new("PHILOSORAPTOR", TemplateRecord::new(984, "Philosoraptor")),
    Entry::new("P_OAK", TemplateRecord::new(24321, "Professor-Oak")),
    Entry::new("SCUMBAG", TemplateRecord::new(364688, "Scumbag-Steve")),
    Entry::new("SPARTA", TemplateRecord::new(1013, "sparta")),
    Entry::new("SPIDERMAN", TemplateRecord::new(1037, "Question-Spiderman")),
    Entry::new(
        "S_AWKWARD_PENGUIN",
        TemplateRecord::new(983, "Socially-Awkward-Penguin"),
    ),
    Entry::new("SWEDISH_CHEF", TemplateRecord::new(186651, "Swedish-Chef")),
    Entry::new("TOWNCRIER", TemplateRecord::new(434537, "Towncrier")),
    Entry::new("TROLLFACE", TemplateRecord::new(1030, "Troll-Face")),
    Entry::new("UNICORN_BOY", TemplateRecord::new(57022, "unicorn-boy")),
    Entry::new("US_POINT", TemplateRecord::new(131083, "Uncle-Sam-Point")),
    Entry::new("XZIBIT", TemplateRecord::new(3114, "XZIBIT")),
    Entry::new(
        "Y_U_NO",
        TemplateRecord::new(165241, "Y-U-NO").with_default_line("Y U NO"),
    ),
];

static BUILTIN: LazyLock<Registry> = LazyLock::new(|| Registry::new(BUILTIN_ENTRIES.to_vec()));

/// Ordered table of generators.
///
/// Entries keep their declaration order; pattern fallback scans them in that
/// order so resolution is deterministic.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// Builds a registry from `entries`, dropping later duplicates of a key.
    pub fn new(entries: Vec<Entry>) -> Self {
        let mut unique: Vec<Entry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if unique.iter().any(|existing| existing.key == entry.key) {
                tracing::warn!(key = entry.key, "ignoring duplicate generator key");
                continue;
            }
            unique.push(entry);
        }
        Self { entries: unique }
    }

    /// The compiled-in generator table.
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Resolves a generator name to its template.
    ///
    /// An exact, case-sensitive key wins. Otherwise `name` is compiled as a
    /// case-insensitive regular expression and the first entry whose key or
    /// one of whose aliases matches is returned.
    ///
    /// # Errors
    ///
    /// [`RegistryError::EmptyName`] for an empty name,
    /// [`RegistryError::InvalidPattern`] when `name` is not a valid regular
    /// expression, and [`RegistryError::UnknownGenerator`] when nothing matches.
    pub fn resolve(&self, name: &str) -> Result<&Entry, RegistryError> {
        if let Some(entry) = self.get(name) {
            tracing::debug!(key = entry.key, "resolved generator by exact key");
            return Ok(entry);
        }

        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let pattern = RegexBuilder::new(name)
            .case_insensitive(true)
            .build()
            .map_err(|source| RegistryError::InvalidPattern {
                name: name.to_string(),
                source,
            })?;

        match self.entries.iter().find(|entry| entry.matches(&pattern)) {
            Some(entry) => {
                tracing::debug!(key = entry.key, pattern = name, "resolved generator by pattern");
                Ok(entry)
            }
            None => Err(RegistryError::UnknownGenerator {
                name: name.to_string(),
            }),
        }
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Entries ordered by canonical key, independent of declaration order.
    pub fn sorted(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.key.cmp(b.key));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves `name` against the built-in table.
pub fn resolve(name: &str) -> Result<TemplateRecord, RegistryError> {
    Registry::builtin().resolve(name).map(|entry| entry.record)
}
