//! Member identity supplied by the upstream identity layer.
//!
//! Authentication happens before requests reach this service; the proxy
//! forwards the authenticated member id in `X-Member-Id`.

use axum_extra::headers::{self, Header};
use http::{HeaderName, HeaderValue};

use crate::error::ApiError;
use crate::models::MemberId;

pub static X_MEMBER_ID: HeaderName = HeaderName::from_static("x-member-id");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XMemberId(pub MemberId);

impl Header for XMemberId {
    fn name() -> &'static HeaderName {
        &X_MEMBER_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(headers::Error::invalid)?;
        let id = value
            .to_str()
            .map_err(|_| headers::Error::invalid())?
            .trim();
        if id.is_empty() {
            return Err(headers::Error::invalid());
        }
        Ok(Self(MemberId::new(id)))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_str(self.0.as_str()) {
            values.extend(std::iter::once(value));
        }
    }
}

pub fn require_member(header: Option<XMemberId>) -> Result<MemberId, ApiError> {
    match header {
        Some(XMemberId(id)) => Ok(id),
        None => Err(ApiError::Unauthorized("Missing member identity".into())),
    }
}
