// tests/news_aggregate.rs
use hoa_portal::news::{aggregate, published_ts, Article, MAX_ARTICLES};

fn art(n: u32, ts: String) -> Article {
    Article {
        title: format!("story {n}"),
        description: format!("story {n}"),
        source: "Fulton County GA".into(),
        url: format!("http://x/{n}"),
        published_at: ts,
    }
}

/// Day `d` of January 2024, as the feed would render it.
fn jan(d: u32) -> String {
    let dt = chrono::NaiveDate::from_ymd_opt(2024, 1, d)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
        .and_utc();
    dt.to_rfc2822()
}

#[test]
fn small_sets_keep_their_length_and_are_sorted() {
    let input: Vec<_> = (1..=7).map(|d| art(d, jan(d))).collect();
    let out = aggregate(input, MAX_ARTICLES);
    assert_eq!(out.len(), 7);
    let stamps: Vec<_> = out
        .iter()
        .map(|a| published_ts(&a.published_at).unwrap())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn large_sets_keep_exactly_the_twenty_newest() {
    // 31 days, shuffled deterministically.
    let mut days: Vec<u32> = (1..=31).collect();
    days.rotate_left(11);
    days.swap(3, 27);
    let input: Vec<_> = days.iter().map(|&d| art(d, jan(d))).collect();

    let out = aggregate(input, MAX_ARTICLES);
    assert_eq!(out.len(), 20);
    let expected: Vec<_> = (12..=31).rev().map(|d| format!("story {d}")).collect();
    let got: Vec<_> = out.iter().map(|a| a.title.clone()).collect();
    assert_eq!(got, expected);
}

#[test]
fn duplicates_and_equal_timestamps_are_all_kept() {
    let same = jan(10);
    let input = vec![art(1, same.clone()), art(1, same.clone()), art(2, same)];
    let out = aggregate(input, MAX_ARTICLES);
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].title, "story 1");
    assert_eq!(out[1].title, "story 1");
    assert_eq!(out[2].title, "story 2");
}

#[test]
fn undated_articles_are_cut_first_when_over_the_cap() {
    let mut input: Vec<_> = (1..=20).map(|d| art(d, jan(d))).collect();
    input.insert(0, art(99, String::new()));
    input.insert(5, art(98, "soon".into()));
    let out = aggregate(input, MAX_ARTICLES);
    assert_eq!(out.len(), 20);
    assert!(out.iter().all(|a| published_ts(&a.published_at).is_some()));
}

#[test]
fn iso_fallback_timestamps_sort_alongside_feed_dates() {
    let input = vec![
        art(1, jan(1)),
        art(2, "2024-01-15T00:00:00.000Z".into()),
        art(3, jan(9)),
    ];
    let out = aggregate(input, MAX_ARTICLES);
    let got: Vec<_> = out.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(got, ["story 2", "story 3", "story 1"]);
}
