//! Single-entry lookup, paging and sorting.

use pretty_assertions::assert_eq;
use relay_ldap::{EntriesOptions, FilterNode, LdapError, Operator, SortSpec};

use crate::common::{names, people, person, TestEnv};

/// Tests lookup of exactly one match.
#[tokio::test]
async fn test_entry_by_attribute() -> anyhow::Result<()> {
    let env = TestEnv::new(people(3));

    let entry = env.connection.get_entry_by_attribute("cn", "user2").await?;
    assert_eq!(entry.first_attribute_value("cn"), Some("user2"));
    assert_eq!(entry.dn(), "cn=user2,ou=people,o=org");
    Ok(())
}

/// Tests that a lookup without matches is reported as not found.
#[tokio::test]
async fn test_entry_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new(people(3));

    let err = env
        .connection
        .get_entry_by_attribute("cn", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, LdapError::EntryNotFound(_)));
    assert_eq!(err.code(), 2);
    Ok(())
}

/// Tests that lookups are restricted to the configured object class.
#[tokio::test]
async fn test_lookup_respects_object_class() -> anyhow::Result<()> {
    let directory = people(1);
    directory.insert(relay_ldap::LdapEntry::new(
        "cn=printer,o=org",
        [
            ("objectClass".to_string(), vec!["device".to_string()]),
            ("cn".to_string(), vec!["printer".to_string()]),
        ],
    ));
    let env = TestEnv::new(directory);

    assert!(env
        .connection
        .get_entry_by_attribute("cn", "printer")
        .await
        .is_err());
    let all = env.connection.get_entries(1, 10, &EntriesOptions::new()).await?;
    assert_eq!(names(&all), vec!["user1"]);
    Ok(())
}

/// Tests that unsorted pages pull no more than the requested chunks.
#[tokio::test]
async fn test_unsorted_pages_are_streamed() -> anyhow::Result<()> {
    let env = TestEnv::new(people(10));

    let page = env.connection.get_entries(2, 3, &EntriesOptions::new()).await?;
    assert_eq!(names(&page), vec!["user4", "user5", "user6"]);
    assert_eq!(env.directory.pulled(), 6);
    assert_eq!(env.directory.abandoned(), 1);

    let first = env.connection.get_entries(1, 3, &EntriesOptions::new()).await?;
    assert_eq!(first.len(), 3);
    assert_eq!(env.directory.pulled(), 9);
    Ok(())
}

/// Tests the last partial page and pages past the end.
#[tokio::test]
async fn test_partial_and_empty_pages() -> anyhow::Result<()> {
    let env = TestEnv::new(people(7));

    let last = env.connection.get_entries(3, 3, &EntriesOptions::new()).await?;
    assert_eq!(names(&last), vec!["user7"]);

    let beyond = env.connection.get_entries(4, 3, &EntriesOptions::new()).await?;
    assert!(beyond.is_empty());
    Ok(())
}

/// Tests that page and page size below one are clamped.
#[tokio::test]
async fn test_page_arguments_are_clamped() -> anyhow::Result<()> {
    let env = TestEnv::new(people(3));

    let page = env.connection.get_entries(0, 0, &EntriesOptions::new()).await?;
    assert_eq!(names(&page), vec!["user1"]);
    Ok(())
}

/// Tests a filtered listing.
#[tokio::test]
async fn test_filtered_entries() -> anyhow::Result<()> {
    let env = TestEnv::new(people(12));

    let filter = FilterNode::from_json(
        r#"{"type":"and","children":[
            {"type":"condition","field":"cn","operator":"i_starts_with","value":"USER1"},
            {"type":"condition","field":"uidNumber","operator":"gte","value":11}
        ]}"#,
    )?;
    let page = env
        .connection
        .get_entries(1, 30, &EntriesOptions::new().filter(filter))
        .await?;
    assert_eq!(names(&page), vec!["user11", "user12"]);
    Ok(())
}

/// Tests that an invalid filter fails before any search.
#[tokio::test]
async fn test_invalid_filter_fails_before_search() -> anyhow::Result<()> {
    let env = TestEnv::new(people(3));

    let filter = FilterNode::condition("cn", Operator::IContains, Some("".into()));
    let err = env
        .connection
        .get_entries(1, 10, &EntriesOptions::new().filter(filter))
        .await
        .unwrap_err();
    assert_eq!(err.code(), 5);
    assert_eq!(env.directory.searches(), 0);
    assert_eq!(env.directory.connects(), 0);
    Ok(())
}

/// Tests natural, descending and multi-key sorting.
#[tokio::test]
async fn test_sorted_entries() -> anyhow::Result<()> {
    let env = TestEnv::new(people(12));

    let page = env
        .connection
        .get_entries(1, 4, &EntriesOptions::new().sort("cn:desc".parse()?))
        .await?;
    assert_eq!(names(&page), vec!["user12", "user11", "user10", "user9"]);

    let second = env
        .connection
        .get_entries(2, 5, &EntriesOptions::new().sort(SortSpec::new().ascending("cn")))
        .await?;
    assert_eq!(
        names(&second),
        vec!["user6", "user7", "user8", "user9", "user10"]
    );
    Ok(())
}

/// Tests stable multi-key ordering.
#[tokio::test]
async fn test_multi_key_sort() -> anyhow::Result<()> {
    let directory = relay_ldap::MemoryDirectory::with_entries(vec![
        person("e1", &[("a", "2"), ("b", "1")]),
        person("e2", &[("a", "1"), ("b", "2")]),
        person("e3", &[("a", "1"), ("b", "1")]),
    ]);
    let env = TestEnv::new(directory);

    let sorted = env
        .connection
        .get_entries(1, 10, &EntriesOptions::new().sort("a,b".parse()?))
        .await?;
    assert_eq!(names(&sorted), vec!["e3", "e2", "e1"]);
    Ok(())
}

/// Tests that sorting over the limit fails without a sort.
#[tokio::test]
async fn test_sort_limit() -> anyhow::Result<()> {
    let env = TestEnv::with_config(
        people(10),
        crate::common::config().sort_limit(5),
        None,
    );

    let err = env
        .connection
        .get_entries(1, 3, &EntriesOptions::new().sort("cn".parse()?))
        .await
        .unwrap_err();
    assert!(matches!(err, LdapError::TooManyResultsToSort { limit: 5 }));
    assert_eq!(env.directory.pulled(), 6);
    assert_eq!(env.directory.abandoned(), 1);

    let unsorted = env.connection.get_entries(1, 3, &EntriesOptions::new()).await?;
    assert_eq!(unsorted.len(), 3);

    let exact = TestEnv::with_config(people(5), crate::common::config().sort_limit(5), None);
    let all = exact
        .connection
        .get_entries(1, 10, &EntriesOptions::new().sort("cn".parse()?))
        .await?;
    assert_eq!(all.len(), 5);
    Ok(())
}

/// Tests that missing attributes are aggregated into one error.
#[tokio::test]
async fn test_attributes_exist() -> anyhow::Result<()> {
    let env = TestEnv::new(relay_ldap::MemoryDirectory::with_entries(vec![person(
        "a",
        &[("mail", "a@example.com")],
    )]));

    env.connection
        .assert_attributes_exist(&["cn", "mail", ""])
        .await?;

    let err = env
        .connection
        .assert_attributes_exist(&["mail", "phone", "title"])
        .await
        .unwrap_err();
    match err {
        LdapError::UserAttributeUndefined(missing) => {
            assert_eq!(missing, vec!["phone".to_string(), "title".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

/// Tests that transport failures surface as connection errors.
#[tokio::test]
async fn test_transport_failure() -> anyhow::Result<()> {
    let env = TestEnv::new(people(3));
    env.connection.check_connection().await?;

    env.directory.set_available(false);
    let err = env
        .connection
        .get_entries(1, 10, &EntriesOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_connection_error());

    env.directory.set_available(true);
    assert_eq!(env.connection.get_entries(1, 10, &EntriesOptions::new()).await?.len(), 3);
    assert_eq!(env.directory.connects(), 2);
    Ok(())
}

/// Tests that malformed attribute names are filter errors raised before
/// any search, and leave the session usable.
#[tokio::test]
async fn test_malformed_attribute_names() -> anyhow::Result<()> {
    let env = TestEnv::new(people(3));

    let err = env
        .connection
        .get_entry_by_attribute("cn)(objectClass=*", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, LdapError::FilterInvalid(_)));

    let err = env
        .connection
        .assert_attributes_exist(&["mail", "sn*"])
        .await
        .unwrap_err();
    assert_eq!(err.code(), 5);

    let filter = FilterNode::condition("cn)(objectClass=*", Operator::Eq, Some("x".into()));
    let err = env
        .connection
        .get_entries(1, 10, &EntriesOptions::new().filter(filter))
        .await
        .unwrap_err();
    assert_eq!(err.code(), 5);
    assert_eq!(env.directory.searches(), 0);

    env.connection.check_connection().await?;
    let entry = env.connection.get_entry_by_attribute(" cn ", "user1").await?;
    assert_eq!(entry.dn(), "cn=user1,ou=people,o=org");
    assert_eq!(env.directory.connects(), 1);
    Ok(())
}

/// Tests that first-match lookups ask for a single entry.
#[tokio::test]
async fn test_first_match_lookups_request_one_entry() -> anyhow::Result<()> {
    let env = TestEnv::new(people(50));

    env.connection.check_connection().await?;
    assert_eq!(env.directory.pulled(), 1);
    let request = env.directory.last_request().expect("search recorded");
    assert_eq!(request.size_limit, Some(1));
    assert_eq!(request.page_size, None);

    env.connection.assert_attributes_exist(&["uidNumber"]).await?;
    assert_eq!(env.directory.pulled(), 2);

    env.connection.get_entry_by_attribute("cn", "user50").await?;
    assert_eq!(env.directory.last_request().and_then(|r| r.size_limit), Some(1));
    Ok(())
}

/// Tests that listings are not size limited and sorted collection is
/// fetched in server pages.
#[tokio::test]
async fn test_listing_requests() -> anyhow::Result<()> {
    let env = TestEnv::with_config(people(10), crate::common::config().sort_limit(20), None);

    env.connection.get_entries(1, 4, &EntriesOptions::new()).await?;
    let request = env.directory.last_request().expect("search recorded");
    assert_eq!(request.page_size, Some(4));
    assert_eq!(request.size_limit, None);

    let sorted = env
        .connection
        .get_entries(1, 4, &EntriesOptions::new().sort("cn".parse()?))
        .await?;
    assert_eq!(sorted.len(), 4);
    let request = env.directory.last_request().expect("search recorded");
    assert_eq!(request.page_size, Some(21));
    assert_eq!(request.size_limit, None);
    Ok(())
}
