//! # Presentation
//!
//! `view_*` helpers funnel values into `place_any`, which appends a
//! `Show` row to a `ShowTable`; `place_show` flushes the table as
//! aligned columns at test end. Unit scaling, `nice_1024`, precision
//! trimming, and commification all live here as a single self-contained,
//! number-focused formatting module.

/// The four independently-toggled verbosity categories: configuration,
/// statistics, time/CPU breakdown, and parameter usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Conf,
    Stat,
    Time,
    Used,
}

/// Verbosity gate character for a `Show` row. `'a'` always shows; `'d'`
/// needs debug mode; `c`/`s`/`t`/`u` need their own category's counter
/// `>= 1`, and their uppercase form needs it `>= 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    Debug,
    Verbose(Category, u32),
}

impl Gate {
    pub fn from_char(c: char) -> Gate {
        match c {
            'a' => Gate::Always,
            'd' => Gate::Debug,
            'c' => Gate::Verbose(Category::Conf, 1),
            'C' => Gate::Verbose(Category::Conf, 2),
            's' => Gate::Verbose(Category::Stat, 1),
            'S' => Gate::Verbose(Category::Stat, 2),
            't' => Gate::Verbose(Category::Time, 1),
            'T' => Gate::Verbose(Category::Time, 2),
            'u' => Gate::Verbose(Category::Used, 1),
            'U' => Gate::Verbose(Category::Used, 2),
            _ => unreachable!("view_*: bad gate char: {}", c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Time,
    Bandwidth,
    Rate,
    Cost,
    Size,
    Long,
    PlainString,
}

#[derive(Debug, Clone)]
pub struct Show {
    pub prefix: Option<String>,
    pub name: String,
    pub unit: Option<String>,
    pub data: String,
    pub alt: Option<String>,
}

/// Settings that gate and scale every row: the four per-category
/// verbosity counters, whether debug diagnostics are enabled, whether
/// unit ladders/commification are disabled (`unify_units`), whether the
/// loc/rem totals pairing is forced (`unify_nodes`), and how many
/// significant digits to keep.
#[derive(Debug, Clone, Copy)]
pub struct DisplaySettings {
    pub verbose_conf: u32,
    pub verbose_stat: u32,
    pub verbose_time: u32,
    pub verbose_used: u32,
    pub debug: bool,
    pub unify_units: bool,
    pub unify_nodes: bool,
    pub precision: u32,
}

impl DisplaySettings {
    fn counter(&self, category: Category) -> u32 {
        match category {
            Category::Conf => self.verbose_conf,
            Category::Stat => self.verbose_stat,
            Category::Time => self.verbose_time,
            Category::Used => self.verbose_used,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            verbose_conf: 0,
            verbose_stat: 0,
            verbose_time: 0,
            verbose_used: 0,
            debug: false,
            unify_units: false,
            unify_nodes: false,
            precision: 3,
        }
    }
}

#[derive(Default)]
pub struct ShowTable {
    rows: Vec<Show>,
}

impl ShowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row if its gate passes for the given settings; a
    /// non-`'a'` row whose value is `<= 0` never shows.
    pub fn place_any(
        &mut self,
        gate: Gate,
        value_for_gate: f64,
        settings: &DisplaySettings,
        prefix: Option<&str>,
        name: &str,
        unit: Option<&str>,
        data: String,
        alt: Option<String>,
    ) {
        if !passes_gate(gate, value_for_gate, settings) {
            return;
        }
        self.rows.push(Show {
            prefix: prefix.map(str::to_string),
            name: name.to_string(),
            unit: unit.map(str::to_string),
            data,
            alt,
        });
    }

    /// Render every accumulated row as `    [prefix]name  =  data unit`,
    /// columns aligned to the widest name/data/unit seen, with the `alt`
    /// form in parentheses when present.
    pub fn place_show(&self) -> String {
        let name_w = self
            .rows
            .iter()
            .map(|r| r.name.len() + r.prefix.as_ref().map_or(0, |p| p.len()))
            .max()
            .unwrap_or(0);
        let data_w = self.rows.iter().map(|r| r.data.len()).max().unwrap_or(0);

        let mut out = String::new();
        for row in &self.rows {
            let label = match &row.prefix {
                Some(p) => format!("{}{}", p, row.name),
                None => row.name.clone(),
            };
            out.push_str(&format!("    {:<name_w$}  =  {:>data_w$}", label, row.data, name_w = name_w, data_w = data_w));
            if let Some(unit) = &row.unit {
                out.push(' ');
                out.push_str(unit);
            }
            if let Some(alt) = &row.alt {
                out.push_str(&format!(" ({})", alt));
            }
            out.push('\n');
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn passes_gate(gate: Gate, value: f64, settings: &DisplaySettings) -> bool {
    match gate {
        Gate::Always => true,
        Gate::Debug => settings.debug,
        Gate::Verbose(category, threshold) => value > 0.0 && settings.counter(category) >= threshold,
    }
}

/// Scale `value` down by the ladder appropriate to `unit`, returning the
/// scaled value and its suffix. Time values are scaled ×10⁹ first (the
/// caller passes seconds; the ladder starts at nanoseconds). When
/// `unify_units` is on, no scaling happens and the base unit is used
/// as-is.
pub fn scale(value: f64, unit: Unit, unify_units: bool) -> (f64, &'static str) {
    if unify_units {
        return (value, base_unit(unit));
    }
    let (start, ladder): (f64, &[&str]) = match unit {
        Unit::Time => (value * 1e9, &["ns", "us", "ms", "sec"]),
        Unit::Bandwidth => (value, &["bytes/sec", "KB/sec", "MB/sec", "GB/sec", "TB/sec"]),
        Unit::Rate => (value, &["/sec", "K/sec", "M/sec", "G/sec", "T/sec"]),
        Unit::Cost => (value, &["ns/GB", "us/GB", "ms/GB", "sec/GB"]),
        Unit::Size => (value, &["bytes", "KB", "MB", "GB", "TB"]),
        Unit::Long => (value, &["", "thousand", "million", "billion", "trillion"]),
        Unit::PlainString => return (value, ""),
    };
    if matches!(unit, Unit::Long) && start < 1_000_000.0 {
        return (start, "");
    }
    let mut v = start;
    let mut idx = 0;
    while v >= 1000.0 && idx + 1 < ladder.len() {
        v /= 1000.0;
        idx += 1;
    }
    (v, ladder[idx])
}

fn base_unit(unit: Unit) -> &'static str {
    match unit {
        Unit::Time => "sec",
        Unit::Bandwidth => "bytes/sec",
        Unit::Rate => "/sec",
        Unit::Cost => "ns/GB",
        Unit::Size => "bytes",
        Unit::Long => "",
        Unit::PlainString => "",
    }
}

/// If `value` is an exact nonzero multiple of `1024^k` for some `1 <= k
/// <= 4`, return `(quotient, suffix)` for the largest such `k`.
/// Otherwise `None`.
pub fn nice_1024(value: u64) -> Option<(u64, &'static str)> {
    if value == 0 {
        return None;
    }
    const SUFFIXES: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    let mut best = None;
    let mut divisor: u64 = 1024;
    for suffix in SUFFIXES.iter() {
        if value % divisor == 0 {
            best = Some((value / divisor, *suffix));
        } else {
            break;
        }
        match divisor.checked_mul(1024) {
            Some(next) => divisor = next,
            None => break,
        }
    }
    best
}

/// Format `value` to `precision` significant digits, trimming trailing
/// zeros and a trailing decimal point.
pub fn format_precision(value: f64, precision: u32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let leading_digits = if magnitude >= 0 { magnitude + 1 } else { 1 };
    let decimals = (precision as i32 - leading_digits).max(0) as usize;
    let formatted = format!("{:.*}", decimals, value);
    trim_trailing(&formatted)
}

fn trim_trailing(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    trimmed.trim_end_matches('.').to_string()
}

/// Insert `,` every three digits in the integer portion.
/// Applied unconditionally: `unify_units` only turns off the KB/MB/GB
/// ladder in `scale`, it does not affect commification — a `-u` run still
/// shows `1,234,567,890 bytes/sec`.
pub fn commify(s: &str) -> String {
    let (sign, rest) = if let Some(stripped) = s.strip_prefix('-') {
        ("-", stripped)
    } else {
        ("", s)
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

fn opt_prefix(prefix: &str) -> Option<&str> {
    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}

fn place_scaled(
    show: &mut ShowTable,
    settings: &DisplaySettings,
    gate_char: char,
    prefix: &str,
    name: &str,
    value: f64,
    unit: Unit,
) {
    let (scaled, label) = scale(value, unit, settings.unify_units);
    let data = format_precision(scaled, settings.precision);
    let data = commify(&data);
    show.place_any(Gate::from_char(gate_char), value, settings, opt_prefix(prefix), name, Some(label), data, None);
}

pub fn view_time(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: f64) {
    place_scaled(show, settings, gate_char, prefix, name, value, Unit::Time);
}

pub fn view_band(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: f64) {
    place_scaled(show, settings, gate_char, prefix, name, value, Unit::Bandwidth);
}

pub fn view_rate(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: f64) {
    place_scaled(show, settings, gate_char, prefix, name, value, Unit::Rate);
}

pub fn view_cost(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: f64) {
    place_scaled(show, settings, gate_char, prefix, name, value, Unit::Cost);
}

/// CPU utilisation fractions print as a percentage, not a ratio, so the
/// gate sees `value * 100` and the unit string reads `% cpus` rather
/// than a bare `%`.
pub fn view_cpus(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: f64) {
    let pct = value * 100.0;
    let data = format_precision(pct, settings.precision);
    let data = commify(&data);
    show.place_any(Gate::from_char(gate_char), pct, settings, opt_prefix(prefix), name, Some("% cpus"), data, None);
}

pub fn view_long(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: i64) {
    let (scaled, label) = scale(value as f64, Unit::Long, settings.unify_units);
    let data = format_precision(scaled, settings.precision);
    let data = commify(&data);
    let unit = if label.is_empty() { None } else { Some(label) };
    show.place_any(Gate::from_char(gate_char), value as f64, settings, opt_prefix(prefix), name, unit, data, None);
}

/// An exact multiple of a power-of-1024 prints with a `KiB`/`MiB`/...
/// suffix and the raw byte count in parentheses; anything else falls
/// back to the ordinary decimal size ladder.
pub fn view_size(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: u64) {
    let gate = Gate::from_char(gate_char);
    let prefix = opt_prefix(prefix);
    if !settings.unify_units {
        if let Some((quotient, suffix)) = nice_1024(value) {
            let alt = commify(&value.to_string());
            show.place_any(gate, value as f64, settings, prefix, name, Some(suffix), quotient.to_string(), Some(alt));
            return;
        }
    }
    let (scaled, label) = scale(value as f64, Unit::Size, settings.unify_units);
    let data = format_precision(scaled, settings.precision);
    let data = commify(&data);
    show.place_any(gate, value as f64, settings, prefix, name, Some(label), data, None);
}

pub fn view_strn(show: &mut ShowTable, settings: &DisplaySettings, gate_char: char, prefix: &str, name: &str, value: &str) {
    let gate_value = if value.is_empty() { 0.0 } else { 1.0 };
    show.place_any(
        Gate::from_char(gate_char),
        gate_value,
        settings,
        opt_prefix(prefix),
        name,
        None,
        value.to_string(),
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_steps_down_bandwidth_ladder() {
        let (v, unit) = scale(1_500_000.0, Unit::Bandwidth, false);
        assert_eq!(unit, "MB/sec");
        assert!((v - 1.5).abs() < 1e-9);
    }

    #[test]
    fn unify_units_skips_scaling() {
        let (v, unit) = scale(1_500_000.0, Unit::Bandwidth, true);
        assert_eq!(v, 1_500_000.0);
        assert_eq!(unit, "bytes/sec");
    }

    #[test]
    fn nice_1024_detects_mebibyte_multiple() {
        assert_eq!(nice_1024(2 * 1024 * 1024), Some((2, "MiB")));
    }

    #[test]
    fn nice_1024_rejects_non_multiple() {
        assert_eq!(nice_1024(1025), None);
    }

    #[test]
    fn precision_trims_trailing_zeros() {
        assert_eq!(format_precision(1.2000, 3), "1.2");
        assert_eq!(format_precision(100.0, 3), "100");
    }

    #[test]
    fn commify_inserts_thousands_separators() {
        assert_eq!(commify("1234567"), "1,234,567");
        assert_eq!(commify("1234567.89"), "1,234,567.89");
        assert_eq!(commify("-1234"), "-1,234");
    }

    #[test]
    fn gate_always_shows_even_nonpositive() {
        let settings = DisplaySettings::default();
        assert!(passes_gate(Gate::Always, -1.0, &settings));
        assert!(!passes_gate(Gate::Verbose(Category::Stat, 1), 1.0, &settings));
    }

    /// A category's counter only gates its own rows: setting `verbose_stat`
    /// does not make a `time`-gated row visible.
    #[test]
    fn category_counters_are_independent() {
        let settings = DisplaySettings { verbose_stat: 1, ..DisplaySettings::default() };
        assert!(passes_gate(Gate::Verbose(Category::Stat, 1), 1.0, &settings));
        assert!(!passes_gate(Gate::Verbose(Category::Time, 1), 1.0, &settings));
        assert!(!passes_gate(Gate::Verbose(Category::Stat, 2), 1.0, &settings));
    }

    /// `-e 4` on a bandwidth value of 1234567890 bytes/sec scales to
    /// "1.235 GB/sec"; with `-u` the same value stays unscaled but is
    /// still comma-grouped.
    #[test]
    fn precision_flag_scales_and_unify_flag_keeps_commas() {
        let mut show = ShowTable::new();
        let settings = DisplaySettings { precision: 4, ..DisplaySettings::default() };
        view_band(&mut show, &settings, 'a', "", "bw", 1_234_567_890.0);
        let out = show.place_show();
        assert!(out.contains("1.235 GB/sec"), "{}", out);

        let mut show = ShowTable::new();
        let settings = DisplaySettings { unify_units: true, precision: 4, ..DisplaySettings::default() };
        view_band(&mut show, &settings, 'a', "", "bw", 1_234_567_890.0);
        let out = show.place_show();
        assert!(out.contains("1,234,567,890 bytes/sec"), "{}", out);
    }
}
