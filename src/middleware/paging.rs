use std::convert::Infallible;

use mongodb::options::FindOptions;
use rocket::request::{FromRequest, Outcome, Request};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageState {
    pub page_length: u32,
    pub page: u32,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            page_length: 20,
            page: 0,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PageState {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let length: Option<u32> = request
            .query_value("len")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("l").and_then(|it| it.ok()));

        let page: Option<u32> = request
            .query_value("page")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("p").and_then(|it| it.ok()));

        if let Some(p) = page {
            Outcome::Success(PageState {
                page_length: length.unwrap_or(20),
                page: p,
            })
        } else {
            Outcome::Success(PageState {
                page_length: length.unwrap_or(20),
                ..Default::default()
            })
        }
    }
}

impl From<PageState> for FindOptions {
    fn from(state: PageState) -> Self {
        // A zero limit disables limiting on the store side.
        let length = state.page_length.max(1);

        FindOptions::builder()
            .skip(Some(u64::from(state.page) * u64::from(length)))
            .limit(Some(i64::from(length)))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_options_skip_whole_pages() {
        let options = FindOptions::from(PageState {
            page_length: 25,
            page: 3,
        });
        assert_eq!(options.skip, Some(75));
        assert_eq!(options.limit, Some(25));
    }

    #[test]
    fn zero_page_length_still_limits() {
        let options = FindOptions::from(PageState {
            page_length: 0,
            page: 2,
        });
        assert_eq!(options.limit, Some(1));
        assert_eq!(options.skip, Some(2));
    }
}
