//! Shared machinery for the line-oriented description-file grammars.
//!
//! Both the model grammar and the texture-mapping grammar are built from the
//! same pieces: `#`/`;` comment lines, `keyword:arg,arg,...` directives with
//! `key=value` fields, `[range]` version-gating brackets, and integer
//! variables declared by `var:` lines. Each directive handler is a function
//! over an explicit [`ParserState`], so the state machine is testable line
//! by line.

pub mod models;
pub mod textures;

use std::collections::HashMap;

use crate::config::RenderConfig;
use crate::error::{MapTexError, Result};

/// Weights for dotted version components; missing upper-bound components
/// round up to 99 so `1.12-1.14` includes `1.14.4`.
const VSCALE: [i64; 6] = [10_000_000_000, 100_000_000, 1_000_000, 10_000, 100, 1];

/// Collapse every run of non-numeric characters to a single `.`, so
/// `1.16.4-pre2` and `1.16.4_01` compare numerically.
fn normalize_version(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    let mut skip = false;
    for c in v.chars() {
        if c == '.' || c.is_ascii_digit() {
            out.push(c);
            skip = false;
        } else if !skip {
            skip = true;
            out.push('.');
        }
    }
    out
}

/// Parse a dotted version into a comparable integer. With `round_up`,
/// missing trailing components count as 99 (inclusive upper bounds).
pub fn parse_version(v: &str, round_up: bool) -> i64 {
    let normalized = normalize_version(v);
    let parts: Vec<&str> = normalized.split('.').collect();
    let mut ver = 0i64;
    for (i, scale) in VSCALE.iter().enumerate() {
        if i < parts.len() {
            if let Ok(n) = parts[i].parse::<i64>() {
                ver += scale * n;
            }
        } else if round_up {
            ver += scale * 99;
        }
    }
    ver
}

/// Check `ver` against a range `low-high`; either bound may be empty for
/// "unbounded in that direction", a bare value means that value only, and an
/// exact string match short-circuits.
pub fn check_version_range(ver: &str, range: &str) -> bool {
    if ver == range {
        return true;
    }
    let v = parse_version(ver, false);
    if v == 0 {
        return false;
    }
    let (low, high) = match range.split_once('-') {
        Some((lo, hi)) => (lo, hi),
        None => (range, range),
    };
    if !low.is_empty() && parse_version(low, false) > v {
        return false;
    }
    high.is_empty() || parse_version(high, true) >= v
}

/// Integer variable bindings declared by `var:` lines.
///
/// Values support `name+offset` arithmetic; `%`- and `&`-prefixed names are
/// block/item unique ids that auto-create as 0 on first reference. The
/// offset is applied only when the base value is positive, so an offset
/// against an unassigned auto-created id stays 0.
#[derive(Debug, Clone, Default)]
pub struct VarMap {
    vars: HashMap<String, i32>,
}

impl VarMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: i32) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.vars.get(name).copied()
    }

    /// Resolve a value field: a literal integer, or a variable reference
    /// with optional `+offset`.
    pub fn get_int_value(&mut self, val: &str) -> std::result::Result<i32, String> {
        let first = val.chars().next().ok_or_else(|| "empty value".to_string())?;
        if first.is_alphabetic() || first == '%' || first == '&' {
            let (name, offset) = match val.find('+') {
                Some(pos) if pos > 0 => {
                    let offset = val[pos + 1..]
                        .parse::<i32>()
                        .map_err(|_| format!("invalid offset - {val}"))?;
                    (&val[..pos], offset)
                }
                _ => (val, 0),
            };
            let v = match self.vars.get(name) {
                Some(&v) => v,
                None if first == '%' || first == '&' => {
                    self.vars.insert(name.to_string(), 0);
                    0
                }
                None => return Err(format!("invalid ID - {val}")),
            };
            if offset != 0 && v > 0 {
                Ok(v + offset)
            } else {
                Ok(v)
            }
        } else {
            val.parse::<i32>().map_err(|_| format!("invalid ID - {val}"))
        }
    }
}

/// Resolve a block name field: strips a `%`/`&` unique-id prefix and any
/// `+offset` suffix, and prepends `modid:` when the name has no namespace.
pub fn get_block_name(modid: &str, val: &str) -> std::result::Result<String, String> {
    let first = val.chars().next().ok_or_else(|| "empty name".to_string())?;
    if !(first.is_alphabetic() || first == '%' || first == '&') {
        return Err(format!("invalid ID - {val}"));
    }
    let mut name = if first == '%' || first == '&' {
        &val[1..]
    } else {
        val
    };
    if let Some(pos) = name.find('+') {
        if pos > 0 {
            name = &name[..pos];
        }
    }
    if name.contains(':') {
        Ok(name.to_string())
    } else {
        Ok(format!("{modid}:{name}"))
    }
}

/// Mutable state carried across the lines of one description file.
#[derive(Debug)]
pub struct ParserState<'a> {
    /// File name for error messages.
    pub filename: String,
    /// Current line number (1-based).
    pub line_no: usize,
    /// Active mod namespace for un-namespaced block names.
    pub mod_id: String,
    /// Version of the active mod, used by `[modname:range]` brackets.
    pub mod_version: Option<String>,
    pub vars: VarMap,
    pub config: &'a RenderConfig,
    /// Versions of loaded mods, for `modname:` matching.
    pub mod_versions: &'a HashMap<String, String>,
}

impl<'a> ParserState<'a> {
    pub fn new(
        filename: &str,
        config: &'a RenderConfig,
        mod_versions: &'a HashMap<String, String>,
    ) -> ParserState<'a> {
        ParserState {
            filename: filename.to_string(),
            line_no: 0,
            mod_id: "minecraft".to_string(),
            mod_version: None,
            vars: VarMap::new(),
            config,
            mod_versions,
        }
    }

    /// Fatal-to-file error at the current position.
    pub fn err(&self, message: impl Into<String>) -> MapTexError {
        MapTexError::format(&self.filename, self.line_no, message)
    }

    /// Strip a leading `[range]` / `[mod:range]` gate. Returns `None` when
    /// the gate fails and the line should be skipped, or the remainder of
    /// the line otherwise. A malformed bracket is fatal to the file.
    ///
    /// `mod:` ranges check the version of the active mod (set by a prior
    /// `modname:` match); with no active mod the gate never passes.
    pub fn strip_version_gates<'l>(&self, mut line: &'l str) -> Result<Option<&'l str>> {
        while let Some(rest) = line.strip_prefix('[') {
            let end = rest
                .find(']')
                .ok_or_else(|| self.err("bad version limit"))?;
            let gate = &rest[..end];
            let passes = match gate.strip_prefix("mod:") {
                Some(range) => match &self.mod_version {
                    Some(ver) => check_version_range(ver, range),
                    None => false,
                },
                None => check_version_range(&self.config.game_version, gate),
            };
            if !passes {
                return Ok(None);
            }
            line = &rest[end + 1..];
        }
        Ok(Some(line))
    }
}

/// Split a directive line into keyword and argument text at the first `:`.
pub fn split_directive(line: &str) -> Option<(&str, &str)> {
    let (kw, rest) = line.split_once(':')?;
    Some((kw.trim(), rest))
}

/// Split a directive's arguments on `,` and each field into `key=value`.
/// Fields without `=` yield an empty value.
pub fn split_fields(args: &str) -> Vec<(&str, &str)> {
    args.split(',')
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|f| match f.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (f, ""),
        })
        .collect()
}

/// True for blank and comment lines.
pub fn is_comment(line: &str) -> bool {
    let t = line.trim_start();
    t.is_empty() || t.starts_with('#') || t.starts_with(';')
}

/// A data/state variant selection from `data=` fields: everything, one
/// value, or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSelection {
    All,
    Single(u16),
    Range(u16, u16),
}

impl DataSelection {
    /// Parse a `data=` value, resolving variables.
    pub fn parse(val: &str, vars: &mut VarMap) -> std::result::Result<DataSelection, String> {
        if val == "*" {
            return Ok(DataSelection::All);
        }
        if let Some((lo, hi)) = val.split_once('-') {
            let lo = vars.get_int_value(lo)?;
            let hi = vars.get_int_value(hi)?;
            if lo < 0 || hi < lo {
                return Err(format!("invalid data range - {val}"));
            }
            return Ok(DataSelection::Range(lo as u16, hi as u16));
        }
        let v = vars.get_int_value(val)?;
        if v < 0 {
            return Err(format!("invalid data value - {val}"));
        }
        Ok(DataSelection::Single(v as u16))
    }

    /// Expand against a block's variant count.
    pub fn variants(&self, count: u16) -> Vec<u16> {
        match *self {
            DataSelection::All => (0..count).collect(),
            DataSelection::Single(v) => {
                if v < count {
                    vec![v]
                } else {
                    Vec::new()
                }
            }
            DataSelection::Range(lo, hi) => (lo..=hi.min(count.saturating_sub(1))).collect(),
        }
    }
}

/// Accumulated `data=` fields of one directive. Empty (or any `*`) means
/// every state variant.
#[derive(Debug, Clone, Default)]
pub struct DataBits {
    bits: std::collections::BTreeSet<u16>,
}

impl DataBits {
    pub fn new() -> DataBits {
        DataBits::default()
    }

    /// Merge one `data=` value.
    pub fn add(&mut self, val: &str, vars: &mut VarMap) -> std::result::Result<(), String> {
        match DataSelection::parse(val, vars)? {
            DataSelection::All => self.bits.clear(),
            DataSelection::Single(v) => {
                self.bits.insert(v);
            }
            DataSelection::Range(lo, hi) => {
                self.bits.extend(lo..=hi);
            }
        }
        Ok(())
    }

    pub fn is_all(&self) -> bool {
        self.bits.is_empty()
    }

    /// Selected variants of a block with `count` states.
    pub fn variants(&self, count: u16) -> Vec<u16> {
        if self.bits.is_empty() {
            (0..count).collect()
        } else {
            self.bits.iter().copied().filter(|&v| v < count).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_range_basics() {
        assert!(check_version_range("1.12.2", "1.10-1.14"));
        assert!(!check_version_range("1.9", "1.10-1.14"));
        assert!(check_version_range("1.12.2", "1.12.2"));
        // Inclusive upper bound rounds missing components up.
        assert!(check_version_range("1.14.4", "1.12-1.14"));
        assert!(!check_version_range("1.15", "1.12-1.14"));
    }

    #[test]
    fn test_version_range_open_bounds() {
        assert!(check_version_range("1.20.4", "1.13-"));
        assert!(check_version_range("1.7.10", "-1.12"));
        assert!(!check_version_range("1.12.2", "1.13-"));
        assert!(!check_version_range("1.13", "-1.12"));
    }

    #[test]
    fn test_version_normalization() {
        assert!(check_version_range("1.16.4-pre2", "1.16-1.17"));
        assert_eq!(parse_version("1.12.2", false), parse_version("1.12_2", false));
    }

    #[test]
    fn test_get_int_value() {
        let mut vars = VarMap::new();
        vars.set("stone", 1);
        assert_eq!(vars.get_int_value("5").unwrap(), 5);
        assert_eq!(vars.get_int_value("stone").unwrap(), 1);
        assert_eq!(vars.get_int_value("stone+3").unwrap(), 4);
        assert!(vars.get_int_value("missing").is_err());
    }

    #[test]
    fn test_unique_ids_auto_create() {
        let mut vars = VarMap::new();
        assert_eq!(vars.get_int_value("%custom_block").unwrap(), 0);
        // Auto-created as zero; offset is not applied to unassigned ids.
        assert_eq!(vars.get_int_value("%custom_block+2").unwrap(), 0);
        vars.set("%custom_block", 7);
        assert_eq!(vars.get_int_value("%custom_block+2").unwrap(), 9);
    }

    #[test]
    fn test_get_block_name() {
        assert_eq!(get_block_name("minecraft", "stone").unwrap(), "minecraft:stone");
        assert_eq!(get_block_name("foomod", "%widget+2").unwrap(), "foomod:widget");
        assert_eq!(
            get_block_name("foomod", "minecraft:stone").unwrap(),
            "minecraft:stone"
        );
        assert!(get_block_name("minecraft", "123").is_err());
    }

    #[test]
    fn test_strip_version_gates() {
        let config = RenderConfig {
            game_version: "1.12.2".to_string(),
            ..RenderConfig::default()
        };
        let mods = HashMap::new();
        let state = ParserState::new("test.txt", &config, &mods);
        assert_eq!(
            state.strip_version_gates("[1.10-1.14]block:id=stone").unwrap(),
            Some("block:id=stone")
        );
        assert_eq!(state.strip_version_gates("[1.13-]block:id=x").unwrap(), None);
        assert!(state.strip_version_gates("[1.10- block:id=x").is_err());
    }

    #[test]
    fn test_mod_version_gate() {
        let config = RenderConfig::default();
        let mods = HashMap::new();
        let mut state = ParserState::new("test.txt", &config, &mods);
        // No active mod: mod-ranged gates never pass.
        assert_eq!(state.strip_version_gates("[mod:1.0-]x").unwrap(), None);
        state.mod_version = Some("2.3.1".to_string());
        assert_eq!(state.strip_version_gates("[mod:2.0-2.5]x").unwrap(), Some("x"));
        assert_eq!(state.strip_version_gates("[mod:3.0-]x").unwrap(), None);
    }

    #[test]
    fn test_split_fields() {
        let fields = split_fields("id=stone,data=*,scale=16,allfaces");
        assert_eq!(fields[0], ("id", "stone"));
        assert_eq!(fields[1], ("data", "*"));
        assert_eq!(fields[3], ("allfaces", ""));
    }

    #[test]
    fn test_data_bits_accumulate() {
        let mut vars = VarMap::new();
        let mut bits = DataBits::new();
        assert!(bits.is_all());
        bits.add("2", &mut vars).unwrap();
        bits.add("5-6", &mut vars).unwrap();
        assert_eq!(bits.variants(8), vec![2, 5, 6]);
        assert_eq!(bits.variants(6), vec![2, 5]);
        bits.add("*", &mut vars).unwrap();
        assert!(bits.is_all());
        assert_eq!(bits.variants(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_data_selection() {
        let mut vars = VarMap::new();
        assert_eq!(DataSelection::parse("*", &mut vars).unwrap(), DataSelection::All);
        assert_eq!(
            DataSelection::parse("3", &mut vars).unwrap(),
            DataSelection::Single(3)
        );
        assert_eq!(
            DataSelection::parse("2-5", &mut vars).unwrap(),
            DataSelection::Range(2, 5)
        );
        assert_eq!(DataSelection::Range(2, 5).variants(4), vec![2, 3]);
        assert_eq!(DataSelection::All.variants(3), vec![0, 1, 2]);
        assert_eq!(DataSelection::Single(9).variants(4), Vec::<u16>::new());
    }
}
