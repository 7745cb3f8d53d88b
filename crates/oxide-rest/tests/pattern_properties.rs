//! Property-based tests for URL pattern reversal.

use oxide_rest::{Params, Query, ResourcePattern};
use proptest::prelude::*;

fn nested_pattern() -> ResourcePattern {
    ResourcePattern::parse(r"^shelf/(?P<shelf>[a-z0-9-]+)/book/(?P<isbn>[\d-]+)/$").unwrap()
}

proptest! {
    #[test]
    fn generated_urls_parse_back(
        shelf in "[a-z0-9][a-z0-9-]{0,20}",
        isbn in "[0-9][0-9-]{0,16}",
    ) {
        let pattern = nested_pattern();
        let params: Params = [("shelf", shelf.as_str()), ("isbn", isbn.as_str())].into();

        let url = pattern.get_url(&Query::new(), &params).unwrap();
        prop_assert_eq!(pattern.params_from_uri(&url).unwrap(), params.clone());

        let absolute = pattern
            .get_absolute_url(Some("http://localhost/api/"), &Query::new(), &params)
            .unwrap();
        prop_assert_eq!(pattern.params_from_uri(&absolute).unwrap(), params);
    }

    #[test]
    fn unknown_parameters_are_rejected(name in "[a-z]{1,8}") {
        prop_assume!(name != "shelf" && name != "isbn");
        let pattern = nested_pattern();
        let params: Params = [("shelf", "a"), ("isbn", "1"), (name.as_str(), "x")].into();
        prop_assert!(pattern.get_url(&Query::new(), &params).is_err());
    }

    #[test]
    fn query_strings_do_not_disturb_parameters(page in 1u32..500, q in "[a-zA-Z ]{0,12}") {
        let pattern = nested_pattern();
        let params: Params = [("shelf", "sci-fi"), ("isbn", "978-0441013593")].into();
        let mut query = Query::new();
        query.insert("page".to_string(), page.into());
        query.insert("q".to_string(), q.into());

        let url = pattern.get_url(&query, &params).unwrap();
        prop_assert!(url.starts_with("shelf/sci-fi/book/978-0441013593/?"));
        prop_assert_eq!(pattern.params_from_uri(&url).unwrap(), params);
    }
}
