use poem_openapi::Object;

/// Unified message submission.
#[derive(Object, Debug)]
pub struct SendMessageRequestDto {
    /// Name of a configured sender.
    pub sender: String,
    #[oai(rename = "msgtype")]
    pub msg_type: String,
    /// Literal text when `simple` is set, otherwise a JSON object encoded as a string.
    pub content: String,
    #[oai(default)]
    pub title: String,
    #[oai(default)]
    pub tos: Vec<String>,
    #[oai(default)]
    pub ccs: Vec<String>,
    /// JSON object encoded as a string, merged into the provider payload.
    #[oai(default)]
    pub extra: String,
    /// Deliver before responding and report the provider result.
    #[oai(default)]
    pub sync: bool,
    #[oai(default)]
    pub simple: bool,
    #[oai(default)]
    pub ats: Vec<String>,
    #[oai(default)]
    pub at_mobiles: Vec<String>,
}

#[derive(Object, Debug)]
pub struct GetUidRequestDto {
    #[oai(validator(min_length = 1))]
    pub sender: String,
    #[oai(validator(min_length = 1))]
    pub phone: String,
}
