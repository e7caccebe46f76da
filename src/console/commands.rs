//! Console command parsing.
//!
//! One command per line. Blank lines and lines starting with `#` are ignored
//! so scripts can carry comments.

use crate::common::{AddressWidth, ProcessId, ProcessKind, SystemRole};
use crate::settings::{AllocationType, RomSize, Settings, SettingsOptions};
use std::str::FromStr;

/// A single settings field given to `set`.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingOverride {
    Ram(u32),
    PageKb(u32),
    Tlb(u32),
    TlbEnabled(bool),
    Width(AddressWidth),
    Rom(RomSize),
    Swap(u8),
    Allocation(AllocationType),
}

/// A parsed console command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Set(Vec<SettingOverride>),
    Add {
        kind: ProcessKind,
        size_gb: f64,
        has_priority: bool,
    },
    Stop(ProcessId),
    Resume(ProcessId),
    Remove(ProcessId),
    List,
    Show,
    Options(Option<u32>),
    Simulate,
    Results,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line; `Ok(None)` for blank and comment lines.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let cmd = match verb.as_str() {
            "set" => Command::Set(parse_overrides(&args)?),
            "add" => parse_add(&args)?,
            "stop" => Command::Stop(parse_id(&args)?),
            "resume" => Command::Resume(parse_id(&args)?),
            "remove" | "rm" => Command::Remove(parse_id(&args)?),
            "list" | "ls" => Command::List,
            "show" => Command::Show,
            "options" => Command::Options(match args.first() {
                Some(ram) => Some(parse_num(ram, "RAM size")?),
                None => None,
            }),
            "simulate" | "run" => Command::Simulate,
            "results" => Command::Results,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{}'; try 'help'", other)),
        };
        Ok(Some(cmd))
    }
}

fn parse_num<T: FromStr>(value: &str, what: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{} must be a number, got '{}'", what, value))
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(format!("expected on/off, got '{}'", value)),
    }
}

fn parse_id(args: &[&str]) -> Result<ProcessId, String> {
    let raw = args.first().ok_or("missing process id")?;
    raw.parse()
        .map_err(|_| format!("process id must be a number, got '{}'", raw))
}

fn parse_overrides(args: &[&str]) -> Result<Vec<SettingOverride>, String> {
    if args.is_empty() {
        return Err("set needs at least one key=value pair".to_string());
    }
    args.iter()
        .map(|pair| -> Result<SettingOverride, String> {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            Ok(match key.to_ascii_lowercase().as_str() {
                "ram" => SettingOverride::Ram(parse_num(value, "RAM size")?),
                "page" => SettingOverride::PageKb(parse_num(
                    value.trim_end_matches(|c: char| c.is_ascii_alphabetic()),
                    "page size",
                )?),
                "tlb" => SettingOverride::Tlb(parse_num(value, "TLB size")?),
                "tlb_enabled" => SettingOverride::TlbEnabled(parse_bool(value)?),
                "va" | "width" => SettingOverride::Width(value.parse()?),
                "rom" => SettingOverride::Rom(value.parse()?),
                "swap" => SettingOverride::Swap(parse_num(value, "swap share")?),
                "alloc" | "allocation" => SettingOverride::Allocation(value.parse()?),
                other => return Err(format!("unknown setting '{}'", other)),
            })
        })
        .collect()
}

fn parse_add(args: &[&str]) -> Result<Command, String> {
    let [class, name, size, rest @ ..] = args else {
        return Err("usage: add user <name> <size_gb> [priority] | add system <role> <size_gb> [priority]".to_string());
    };
    let kind = match class.to_ascii_lowercase().as_str() {
        "user" => ProcessKind::user(*name),
        "system" => ProcessKind::system(name.parse::<SystemRole>()?),
        other => return Err(format!("process type must be user or system, got '{}'", other)),
    };
    let has_priority = match rest {
        [] => false,
        [flag] if flag.eq_ignore_ascii_case("priority") => true,
        _ => return Err(format!("unexpected arguments: {}", rest.join(" "))),
    };
    Ok(Command::Add {
        kind,
        size_gb: parse_num(size, "process size")?,
        has_priority,
    })
}

/// Builds a candidate from `base` and the given overrides.
///
/// A RAM change keeps the page size, TLB size and width if the new RAM size
/// still offers them and falls back to its first option otherwise.
pub fn apply_overrides(base: &Settings, overrides: &[SettingOverride]) -> Settings {
    let mut next = base.clone();
    for o in overrides {
        if let SettingOverride::Ram(ram) = o {
            next.ram_size_gb = *ram;
            let options = SettingsOptions::for_ram(*ram);
            let fallback = Settings::for_ram(*ram);
            if !options.page_sizes_kb.contains(&next.page_size_kb) {
                next.page_size_kb = fallback.page_size_kb;
            }
            if !options.tlb_sizes.contains(&next.tlb_size) {
                next.tlb_size = fallback.tlb_size;
            }
            if !options.widths.contains(&next.address_width) {
                next.address_width = fallback.address_width;
            }
        }
    }
    for o in overrides {
        match o {
            SettingOverride::Ram(_) => {}
            SettingOverride::PageKb(kb) => next.page_size_kb = *kb,
            SettingOverride::Tlb(n) => next.tlb_size = *n,
            SettingOverride::TlbEnabled(on) => next.tlb_enabled = *on,
            SettingOverride::Width(w) => next.address_width = *w,
            SettingOverride::Rom(r) => next.rom_size = *r,
            SettingOverride::Swap(s) => next.swap_percent = *s,
            SettingOverride::Allocation(a) => next.allocation_type = *a,
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blanks_are_skipped() {
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(Command::parse("# set ram=4"), Ok(None));
    }

    #[test]
    fn page_accepts_kb_suffix() {
        assert_eq!(
            Command::parse("set page=8KB"),
            Ok(Some(Command::Set(vec![SettingOverride::PageKb(8)])))
        );
    }
}
