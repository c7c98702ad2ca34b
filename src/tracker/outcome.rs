//! What the tracker needs to know about a wrapped call's result.

/// A response from the underlying client.
pub trait ObservedResponse {
    fn status(&self) -> u16;

    /// Reason phrase, e.g. "Not Found". Empty if unknown.
    fn status_text(&self) -> String {
        String::new()
    }
}

/// An error from the underlying client.
pub trait ObservedError {
    /// Human readable failure description.
    fn message(&self) -> String;

    /// Status carried by the error, if the failure came with a response.
    fn status(&self) -> Option<u16> {
        None
    }
}

impl ObservedResponse for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }

    fn status_text(&self) -> String {
        reqwest::Response::status(self)
            .canonical_reason()
            .unwrap_or_default()
            .to_string()
    }
}

impl ObservedError for reqwest::Error {
    fn message(&self) -> String {
        self.to_string()
    }

    fn status(&self) -> Option<u16> {
        reqwest::Error::status(self).map(|s| s.as_u16())
    }
}

impl ObservedError for std::io::Error {
    fn message(&self) -> String {
        self.to_string()
    }
}
