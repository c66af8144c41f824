use std::num::NonZeroUsize;
use std::path::Path;

use lru::LruCache;

/// Server-reported conditions that force the opener to stop. Closed set;
/// anything else is informational.
pub const STOP_MESSAGES: [&str; 6] = [
    "SMT_ITEM_MIX_NEED_METERIAL",
    "SMT_CANT_CONVERT_NOW",
    "SMT_GACHA_NO_MORE_ITEM_SHORT",
    "SMT_NOTI_LEFT_LIMITED_GACHA_ITEM",
    "SMT_GACHA_CANCEL",
    "SMT_COMMON_NO_MORE_ITEM_TO_USE",
];

pub fn is_terminal(name: &str) -> bool {
    STOP_MESSAGES.contains(&name)
}

pub const DEFAULT_DECODE_CACHE: usize = 128;

/// Decodes raw system-message strings (`@<index>` optionally followed by
/// 0x0B-separated key/value tokens) into symbolic names via a name table.
/// Decodes repeat heavily during an opening run, so results are cached.
pub struct SystemMessageDecoder {
    names: Vec<String>,
    cache: LruCache<String, String>,
}

impl std::fmt::Debug for SystemMessageDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SystemMessageDecoder")
            .field("names", &self.names.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl SystemMessageDecoder {
    pub fn new(names: Vec<String>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).unwrap();
        Self {
            names,
            cache: LruCache::new(capacity),
        }
    }

    /// Load a name table from a file with one symbolic name per line,
    /// line number = message index. Blank lines keep their index.
    pub fn from_table_file(path: &Path, cache_size: usize) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read message table {}: {}", path.display(), err))?;
        let names = content.lines().map(|line| line.trim().to_string()).collect();
        Ok(Self::new(names, cache_size))
    }

    pub fn decode(&mut self, raw: &str) -> Result<String, String> {
        if let Some(name) = self.cache.get(raw) {
            return Ok(name.clone());
        }

        let body = raw
            .strip_prefix('@')
            .ok_or_else(|| format!("system message missing '@' prefix: '{}'", raw))?;
        let index_token = body.split('\u{0b}').next().unwrap_or(body);
        let index: usize = index_token
            .parse()
            .map_err(|_| format!("system message index '{}' is not numeric", index_token))?;
        let name = self
            .names
            .get(index)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| format!("system message index {} outside name table", index))?
            .clone();

        self.cache.put(raw.to_string(), name.clone());
        Ok(name)
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.len()
    }
}
