//! Stylesheet requests and origin URL construction
//!
//! Two upstream API shapes are supported:
//! - legacy `css`: one `family` parameter (several families joined with `|`)
//!   plus optional `display`, `text` and `subset`
//! - modern `css2`: one `family` parameter per family plus optional
//!   `display` and `text`

use crate::config::UpstreamConfig;
use crate::error::{GfoError, GfoResult};
use std::fmt;

/// Upstream stylesheet API shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// Legacy comma/pipe-joined family form
    Css,
    /// Repeated `family` parameter form
    Css2,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css => write!(f, "css"),
            Self::Css2 => write!(f, "css2"),
        }
    }
}

/// A request for a font stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetRequest {
    pub api: ApiVersion,
    pub families: Vec<String>,
    pub display: Option<String>,
    pub text: Option<String>,
    pub subset: Option<String>,
}

impl StylesheetRequest {
    /// Legacy API request for a family specification such as
    /// `Roboto:400,700|Open Sans`
    pub fn css(
        family: impl Into<String>,
        display: Option<String>,
        text: Option<String>,
        subset: Option<String>,
    ) -> GfoResult<Self> {
        Self {
            api: ApiVersion::Css,
            families: vec![family.into()],
            display,
            text,
            subset,
        }
        .validated()
    }

    /// Modern API request with one entry per family (e.g. `Roboto:wght@400;700`)
    pub fn css2(
        families: Vec<String>,
        display: Option<String>,
        text: Option<String>,
    ) -> GfoResult<Self> {
        Self {
            api: ApiVersion::Css2,
            families,
            display,
            text,
            subset: None,
        }
        .validated()
    }

    /// Build a request from a raw query string of either API shape
    pub fn from_query(api: ApiVersion, query: &str) -> GfoResult<Self> {
        let mut families = Vec::new();
        let mut display = None;
        let mut text = None;
        let mut subset = None;

        for (name, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match name.as_ref() {
                "family" => families.push(value.into_owned()),
                "display" => display = Some(value.into_owned()),
                "text" => text = Some(value.into_owned()),
                "subset" => subset = Some(value.into_owned()),
                _ => {}
            }
        }

        match api {
            ApiVersion::Css => {
                if families.is_empty() {
                    return Err(GfoError::InvalidRequest("missing family".to_string()));
                }
                Self::css(families.join("|"), display, text, subset)
            }
            ApiVersion::Css2 => Self::css2(families, display, text),
        }
    }

    /// Full origin URL of the stylesheet (also its cache identity)
    pub fn origin_url(&self, upstream: &UpstreamConfig) -> String {
        let base = match self.api {
            ApiVersion::Css => &upstream.css_url,
            ApiVersion::Css2 => &upstream.css2_url,
        };

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for family in &self.families {
            query.append_pair("family", family);
        }
        if let Some(ref display) = self.display {
            query.append_pair("display", display);
        }
        if let Some(ref text) = self.text {
            query.append_pair("text", text);
        }
        if self.api == ApiVersion::Css {
            if let Some(ref subset) = self.subset {
                query.append_pair("subset", subset);
            }
        }

        format!("{}?{}", base, query.finish())
    }

    fn validated(self) -> GfoResult<Self> {
        if self.families.is_empty() || self.families.iter().any(|f| f.trim().is_empty()) {
            return Err(GfoError::InvalidRequest(
                "at least one non-empty family is required".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream() -> UpstreamConfig {
        UpstreamConfig::default()
    }

    #[test]
    fn css_url_single_family() {
        let req = StylesheetRequest::css("Roboto", None, None, None).unwrap();
        assert_eq!(
            req.origin_url(&upstream()),
            "https://fonts.googleapis.com/css?family=Roboto"
        );
    }

    #[test]
    fn css_url_all_params_encoded() {
        let req = StylesheetRequest::css(
            "Roboto:400,700|Open Sans",
            Some("swap".to_string()),
            Some("Hello World".to_string()),
            Some("latin".to_string()),
        )
        .unwrap();
        assert_eq!(
            req.origin_url(&upstream()),
            "https://fonts.googleapis.com/css?family=Roboto%3A400%2C700%7COpen+Sans&display=swap&text=Hello+World&subset=latin"
        );
    }

    #[test]
    fn css2_url_repeats_family() {
        let req = StylesheetRequest::css2(
            vec!["Roboto:wght@400;700".to_string(), "Lato".to_string()],
            Some("swap".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(
            req.origin_url(&upstream()),
            "https://fonts.googleapis.com/css2?family=Roboto%3Awght%40400%3B700&family=Lato&display=swap"
        );
    }

    #[test]
    fn css2_never_sends_subset() {
        let mut req = StylesheetRequest::css2(vec!["Lato".to_string()], None, None).unwrap();
        req.subset = Some("latin".to_string());
        assert!(!req.origin_url(&upstream()).contains("subset"));
    }

    #[test]
    fn empty_family_rejected() {
        let err = StylesheetRequest::css("  ", None, None, None).unwrap_err();
        assert!(matches!(err, GfoError::InvalidRequest(_)));
        assert!(StylesheetRequest::css2(vec![], None, None).is_err());
    }

    #[test]
    fn from_query_css2() {
        let req = StylesheetRequest::from_query(
            ApiVersion::Css2,
            "?family=Roboto&family=Open+Sans&display=swap&unknown=1",
        )
        .unwrap();
        assert_eq!(req.families, vec!["Roboto", "Open Sans"]);
        assert_eq!(req.display.as_deref(), Some("swap"));
    }

    #[test]
    fn from_query_css_joins_repeated_families() {
        let req =
            StylesheetRequest::from_query(ApiVersion::Css, "family=Roboto&family=Lato&subset=latin")
                .unwrap();
        assert_eq!(req.families, vec!["Roboto|Lato"]);
        assert_eq!(req.subset.as_deref(), Some("latin"));
    }

    #[test]
    fn from_query_missing_family() {
        let err = StylesheetRequest::from_query(ApiVersion::Css, "display=swap").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn same_request_same_url() {
        let a = StylesheetRequest::css("Roboto", None, None, None).unwrap();
        let b = StylesheetRequest::from_query(ApiVersion::Css, "family=Roboto").unwrap();
        assert_eq!(a.origin_url(&upstream()), b.origin_url(&upstream()));
    }
}
