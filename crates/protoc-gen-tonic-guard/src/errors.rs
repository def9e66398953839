use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to decode input")]
    Decode(#[from] prost::DecodeError),
    #[error("embedded descriptor schema error: {0}")]
    Schema(String),
    #[error("malformed descriptor: {0}")]
    Descriptor(String),
    #[error("unknown match value {value} in {context}")]
    UnknownMatch { value: i32, context: String },
    #[error("failed to register template")]
    Template(#[source] Box<handlebars::TemplateError>),
    #[error("failed to render template")]
    Render(#[from] handlebars::RenderError),
}
