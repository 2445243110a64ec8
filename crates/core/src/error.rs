/// Key under which validator files struct-level (schema) errors.
const STRUCT_ERRORS_KEY: &str = "__all__";

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().take(1).map(move |e| {
                    let reason = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "is invalid".to_string());
                    // Schema messages already name the field they cover.
                    if field == STRUCT_ERRORS_KEY {
                        reason
                    } else {
                        format!("{field} {reason}")
                    }
                })
            })
            .collect();
        fields.sort();
        CoreError::Validation(fields.join("; "))
    }
}
