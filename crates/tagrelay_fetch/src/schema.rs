//! Typed hashtag search responses.
//!
//! The upstream payload is loosely shaped: ids arrive as numbers or strings,
//! `data` may be null, and individual items are sometimes missing fields. The
//! envelope is decoded leniently and each item is validated on its own so one
//! bad item never discards a whole page.

use serde::Deserialize;
use tagrelay_ledger::{MediaId, MediaKind};
use tracing::warn;

/// One page of hashtag search results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    /// Items that passed validation, in upstream order.
    pub items: Vec<SearchItem>,
    /// Token for the next page, if the upstream has more.
    pub continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    data: Option<RawSearchData>,
    #[serde(default, alias = "pagination_token")]
    continuation_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSearchData {
    #[serde(default)]
    items: Option<Vec<serde_json::Value>>,
}

impl SearchPage {
    /// Decode a search response body.
    ///
    /// # Errors
    ///
    /// Fails only if the envelope itself is not a JSON object of the expected
    /// shape. Items that fail validation are dropped with a warning.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let raw: RawSearchResponse = serde_json::from_str(body)?;
        let raw_items = raw.data.unwrap_or_default().items.unwrap_or_default();

        let items = raw_items
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<SearchItem>(value) {
                Ok(item) if item.media_id().is_some() => Some(item),
                Ok(_) => {
                    warn!(index, "Dropping search item without an id");
                    None
                }
                Err(e) => {
                    warn!(index, error = %e, "Dropping undecodable search item");
                    None
                }
            })
            .collect();

        let continuation_token = raw
            .continuation_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            items,
            continuation_token,
        })
    }
}

/// A single media item from a hashtag search.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, derive_getters::Getters)]
pub struct SearchItem {
    /// Primary key; preferred over `id` when both are present.
    #[serde(default)]
    pk: Option<MediaId>,
    /// Secondary identifier.
    #[serde(default)]
    id: Option<MediaId>,
    /// Kind discriminator.
    #[serde(default)]
    is_video: Option<bool>,
    /// Direct media URL for videos.
    #[serde(default)]
    video_url: Option<String>,
    /// Available renditions for images, best first.
    #[serde(default)]
    image_versions: Option<ImageVersions>,
}

/// Container of image renditions.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ImageVersions {
    /// Renditions, best first.
    #[serde(default)]
    pub items: Vec<ImageVersion>,
}

/// A single image rendition.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ImageVersion {
    /// Where the rendition can be fetched.
    #[serde(default)]
    pub url: Option<String>,
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
}

impl SearchItem {
    /// Build an item carrying a video URL.
    pub fn video(id: impl Into<MediaId>, url: impl Into<String>) -> Self {
        Self {
            pk: Some(id.into()),
            is_video: Some(true),
            video_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Build an item carrying a single image rendition.
    pub fn image(id: impl Into<MediaId>, url: impl Into<String>) -> Self {
        Self {
            pk: Some(id.into()),
            is_video: Some(false),
            image_versions: Some(ImageVersions {
                items: vec![ImageVersion {
                    url: Some(url.into()),
                    ..ImageVersion::default()
                }],
            }),
            ..Self::default()
        }
    }

    /// The deduplication key: `pk`, falling back to `id`.
    pub fn media_id(&self) -> Option<&MediaId> {
        self.pk
            .as_ref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.id.as_ref().filter(|id| !id.is_empty()))
    }

    /// Decide what kind of media this item carries.
    ///
    /// An explicit `is_video` flag wins. Without it the payload decides: a
    /// video URL alone means video, image renditions alone mean image.
    /// Anything else is unclassified rather than assumed to be a video.
    pub fn kind(&self) -> Option<MediaKind> {
        match self.is_video {
            Some(true) => Some(MediaKind::Video),
            Some(false) => Some(MediaKind::Image),
            None => match (self.first_video_url(), self.first_image_url()) {
                (Some(_), None) => Some(MediaKind::Video),
                (None, Some(_)) => Some(MediaKind::Image),
                _ => None,
            },
        }
    }

    /// URL of the bytes to download for `kind`.
    pub fn media_url(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Video => self.first_video_url(),
            MediaKind::Image => self.first_image_url(),
        }
    }

    fn first_video_url(&self) -> Option<&str> {
        self.video_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    fn first_image_url(&self) -> Option<&str> {
        self.image_versions
            .as_ref()?
            .items
            .first()?
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_numeric_and_string_ids() {
        let body = r#"{
            "data": {"items": [
                {"pk": 123, "is_video": true, "video_url": "https://cdn.example/v.mp4"},
                {"pk": "456", "is_video": false,
                 "image_versions": {"items": [{"url": "https://cdn.example/i.jpg", "width": 1080}]}}
            ]},
            "pagination_token": "next-page"
        }"#;
        let page = SearchPage::from_json(body).unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].media_id().unwrap().as_str(), "123");
        assert_eq!(page.items[1].media_id().unwrap().as_str(), "456");
        assert_eq!(page.continuation_token.as_deref(), Some("next-page"));
    }

    #[test]
    fn pk_wins_over_id() {
        let body = r#"{"data": {"items": [{"id": "123_999", "pk": 123, "is_video": true, "video_url": "u"}]}}"#;
        let page = SearchPage::from_json(body).unwrap();
        assert_eq!(page.items[0].media_id().unwrap().as_str(), "123");
    }

    #[test]
    fn bad_items_are_dropped_not_fatal() {
        let body = r#"{"data": {"items": [
            {"is_video": true, "video_url": "https://cdn.example/no-id.mp4"},
            {"pk": {"nested": true}},
            {"pk": 7, "is_video": true, "video_url": "https://cdn.example/7.mp4"}
        ]}}"#;
        let page = SearchPage::from_json(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.continuation_token.is_none());
    }

    #[test]
    fn null_data_and_empty_token_yield_empty_page() {
        let page = SearchPage::from_json(r#"{"data": null, "continuation_token": "  "}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.continuation_token.is_none());
    }

    #[test]
    fn kind_policy_is_explicit() {
        let flagged_image = SearchItem {
            is_video: Some(false),
            video_url: Some("https://cdn.example/v.mp4".to_string()),
            ..SearchItem::default()
        };
        assert_eq!(flagged_image.kind(), Some(MediaKind::Image));

        let unflagged_video = SearchItem {
            video_url: Some("https://cdn.example/v.mp4".to_string()),
            ..SearchItem::default()
        };
        assert_eq!(unflagged_video.kind(), Some(MediaKind::Video));

        let unflagged_image = SearchItem::image("1", "https://cdn.example/i.jpg");
        let unflagged_image = SearchItem {
            is_video: None,
            ..unflagged_image
        };
        assert_eq!(unflagged_image.kind(), Some(MediaKind::Image));

        let bare = SearchItem {
            pk: Some(MediaId::from("9")),
            ..SearchItem::default()
        };
        assert_eq!(bare.kind(), None);
    }

    #[test]
    fn image_url_is_first_rendition() {
        let body = r#"{"data": {"items": [{"pk": 1, "is_video": false, "image_versions": {"items": [
            {"url": "https://cdn.example/large.jpg"},
            {"url": "https://cdn.example/small.jpg"}
        ]}}]}}"#;
        let page = SearchPage::from_json(body).unwrap();
        assert_eq!(
            page.items[0].media_url(MediaKind::Image),
            Some("https://cdn.example/large.jpg")
        );
        assert_eq!(page.items[0].media_url(MediaKind::Video), None);
    }
}
