/// Required fields missing from an account record.
///
/// Every offending field is reported at once so callers can surface a
/// single "invalid argument" response instead of failing field by field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed for {}", .fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
}

impl ValidationError {
    pub fn new(fields: Vec<&'static str>) -> Self {
        Self { fields }
    }

    pub fn field(field: &'static str) -> Self {
        Self {
            fields: vec![field],
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| *f == field)
    }
}
