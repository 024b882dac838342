use serde::Serialize;

/// CSV column metadata generated by `#[derive(CsvSchema)]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CsvColumn {
    pub name: &'static str,
    pub required: bool,
    pub kind: &'static str,
    pub description: &'static str,
}
