//! Report Tables
//!
//! Markdown tables of graded measurements: one row per harness function, one
//! column per compiler/type pair.

use crate::classify::Cost;
use crate::grade::{GradeError, Grader};

/// Title of the leading row-name column.
const NAME_HEADER: &str = "Test name";
/// Minimum width of the row-name column.
const NAME_WIDTH: usize = 10;

/// Harness functions graded by default, in table order.
pub const DEFAULT_ROWS: &[&str] = &[
    "preinc", "postinc", "predec", "postdec", "plus", "pluseq", "minus", "minuseq", "mul", "muleq",
    "div", "diveq", "mod", "modeq", "xor_", "xoreq", "and_", "andeq", "or_", "oreq", "shl", "shleq",
    "shr", "shreq", "clz", "lt", "leq", "gt", "geq", "eq", "neq", "not_", "bool_", "neg", "flip",
];

/// One compiler/type combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub compiler: String,
    pub type_name: String,
}

impl Column {
    pub fn new(title: &str, compiler: &str, type_name: &str) -> Self {
        Self {
            title: title.to_string(),
            compiler: compiler.to_string(),
            type_name: type_name.to_string(),
        }
    }

    pub fn width(&self) -> usize {
        self.title.chars().count()
    }
}

/// A captioned table at one bit width.
#[derive(Debug, Clone)]
pub struct Table {
    pub bits: u32,
    pub caption: String,
    pub columns: Vec<Column>,
}

/// One graded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub type_name: String,
    pub function: String,
    pub compiler: String,
    pub cost: Cost,
}

/// Append-only collection of measurements.
#[derive(Debug, Clone, Default)]
pub struct Measurements {
    items: Vec<Measurement>,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, m: Measurement) {
        self.items.push(m);
    }

    /// First measurement for the triple.
    pub fn find(&self, type_name: &str, function: &str, compiler: &str) -> Option<&Measurement> {
        self.items.iter().find(|m| {
            m.type_name == type_name && m.function == function && m.compiler == compiler
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.items.iter()
    }
}

impl Extend<Measurement> for Measurements {
    fn extend<I: IntoIterator<Item = Measurement>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl Table {
    pub fn new(bits: u32, caption: &str, columns: Vec<Column>) -> Self {
        Self {
            bits,
            caption: caption.to_string(),
            columns,
        }
    }

    /// Render the caption, header, separator and one line per row.
    ///
    /// Cells with no measurement are left blank. Grading failures abort the
    /// whole render.
    pub fn render<S: AsRef<str>>(
        &self,
        rows: &[S],
        measurements: &Measurements,
        grader: &Grader,
    ) -> Result<String, GradeError> {
        let mut out = String::new();
        out.push_str(&self.caption);
        out.push_str("\n\n");

        let titles: Vec<&str> = self.columns.iter().map(|c| c.title.as_str()).collect();
        out.push_str(&format!(
            "| {:<w$} | {} |\n",
            NAME_HEADER,
            titles.join(" | "),
            w = NAME_WIDTH
        ));

        let rules: Vec<String> = self.columns.iter().map(|c| "-".repeat(c.width())).collect();
        out.push_str(&format!(
            "| {} | {} |\n",
            "-".repeat(NAME_WIDTH),
            rules.join(" | ")
        ));

        for row in rows {
            let function = row.as_ref();
            let mut cells = Vec::with_capacity(self.columns.len());
            for column in &self.columns {
                let label = match measurements.find(&column.type_name, function, &column.compiler)
                {
                    Some(m) => grader.grade(self.bits, function, m.cost)?.to_string(),
                    None => String::new(),
                };
                cells.push(format!("{:<w$}", label, w = column.width()));
            }
            out.push_str(&format!(
                "| {:<w$} | {} |\n",
                function,
                cells.join(" | "),
                w = NAME_WIDTH
            ));
        }

        Ok(out)
    }
}

/// The 128-, 256- and 512-bit comparison tables.
pub fn default_tables() -> Vec<Table> {
    vec![
        Table::new(
            128,
            "128-bit math using `__uint128_t`, `unsigned _ExtInt(128)`, and `Wider<uint64_t>`:",
            vec![
                Column::new("Clang `uint128`", "clang_trunk", "__uint128_t"),
                Column::new("Clang `_ExtInt`", "clang_trunk", "unsigned _ExtInt(128)"),
                Column::new("Clang `W<u64>`", "clang_trunk", "Wider<uint64_t>"),
                Column::new("GCC `uint128`", "gsnapshot", "__uint128_t"),
                Column::new("GCC `W<u64>`", "gsnapshot", "Wider<uint64_t>"),
            ],
        ),
        Table::new(
            256,
            "256-bit math using `unsigned _ExtInt(256)` and `Wider<Wider<uint64_t>>`:",
            vec![
                Column::new("Clang `_ExtInt`", "clang_trunk", "unsigned _ExtInt(256)"),
                Column::new("Clang `W<W<u64>>`", "clang_trunk", "Wider<Wider<uint64_t>>"),
                Column::new("GCC `W<W<u64>>`", "gsnapshot", "Wider<Wider<uint64_t>>"),
            ],
        ),
        Table::new(
            512,
            "512-bit math using `unsigned _ExtInt(512)` and `Wider<Wider<Wider<uint64_t>>>`:",
            vec![
                Column::new("Clang `_ExtInt`", "clang_trunk", "unsigned _ExtInt(512)"),
                Column::new(
                    "Clang `W<W<W<u64>>>`",
                    "clang_trunk",
                    "Wider<Wider<Wider<uint64_t>>>",
                ),
                Column::new("GCC `W<W<W<u64>>>`", "gsnapshot", "Wider<Wider<Wider<uint64_t>>>"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::PerfectBaseline;

    fn measurement(type_name: &str, function: &str, compiler: &str, raw: u32) -> Measurement {
        Measurement {
            type_name: type_name.to_string(),
            function: function.to_string(),
            compiler: compiler.to_string(),
            cost: Cost::from_raw(raw).unwrap(),
        }
    }

    fn table() -> Table {
        Table::new(
            128,
            "128-bit math:",
            vec![
                Column::new("Clang `uint128`", "clang_trunk", "__uint128_t"),
                Column::new("GCC `W<u64>`", "gsnapshot", "Wider<uint64_t>"),
            ],
        )
    }

    #[test]
    fn test_render_layout() {
        let mut baseline = PerfectBaseline::default();
        baseline.insert(128, "plus", Some(5));
        let grader = Grader::new(baseline);

        let mut ms = Measurements::new();
        ms.push(measurement("__uint128_t", "plus", "clang_trunk", 5));
        ms.push(measurement("Wider<uint64_t>", "plus", "gsnapshot", 7));
        ms.push(measurement("__uint128_t", "div", "clang_trunk", 20004));

        let text = table().render(&["plus", "div"], &ms, &grader).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "128-bit math:");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "| Test name  | Clang `uint128` | GCC `W<u64>` |");
        assert_eq!(lines[3], "| ---------- | --------------- | ------------ |");
        assert_eq!(lines[4], "| plus       | 5 P             | 7            |");
        assert_eq!(lines[5], "| div        | __udivti3       |              |");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_render_propagates_regressions() {
        let mut baseline = PerfectBaseline::default();
        baseline.insert(128, "plus", Some(5));
        let grader = Grader::new(baseline);

        let mut ms = Measurements::new();
        ms.push(measurement("__uint128_t", "plus", "clang_trunk", 4));
        assert!(table().render(&["plus"], &ms, &grader).is_err());
    }

    #[test]
    fn test_find_first_match() {
        let mut ms = Measurements::new();
        ms.push(measurement("__uint128_t", "plus", "clang_trunk", 5));
        ms.push(measurement("__uint128_t", "plus", "gsnapshot", 6));
        assert_eq!(
            ms.find("__uint128_t", "plus", "gsnapshot").map(|m| m.cost.raw()),
            Some(6)
        );
        assert!(ms.find("__uint128_t", "minus", "gsnapshot").is_none());
        assert_eq!(ms.len(), 2);
    }

    #[test]
    fn test_default_tables() {
        let tables = default_tables();
        assert_eq!(tables.iter().map(|t| t.bits).collect::<Vec<_>>(), [128, 256, 512]);
        assert_eq!(tables[0].columns.len(), 5);
        assert_eq!(DEFAULT_ROWS.len(), 35);
    }
}
