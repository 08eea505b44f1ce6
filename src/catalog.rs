//! The read and write operations offered to the HTTP layer, with the
//! argument parsing and empty-result policies each of them follows.

use std::convert::TryFrom;

use crate::db::Db;
use crate::errors::BackendError;
use crate::normalization::normalize_text;
use crate::play::{NewPlay, Play, PlayId, PlaySubmission, PlayUpdate};
use crate::song::{NewSong, Song, SongSubmission};
use crate::user::UserId;

/// How many songs `top` returns when the caller doesn't say.
pub const DEFAULT_TOP_COUNT: i64 = 3;

/// How many songs each page of the listing holds.
pub const PAGE_SIZE: i64 = 10;

pub type SafeDb = dyn Db + Send + Sync;

/// One page of the song listing.
#[derive(Clone, Debug)]
pub struct Page {
    /// The total number of songs.
    pub count: i64,

    /// The 1-based number of this page.
    pub number: u32,

    pub has_next: bool,

    pub results: Vec<Song>,
}

/// Parses the `n` parameter of the ranking. Absent means the default;
/// anything but a non-negative integer is refused. Counts beyond what
/// the store can address saturate, since they all mean "every song".
pub fn parse_top_count(raw: Option<&str>) -> Result<i64, BackendError> {
    let value = match raw {
        None => return Ok(DEFAULT_TOP_COUNT),
        Some(value) => value,
    };
    let digits = value.trim();

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BackendError::InvalidParameter {
            name: "n",
            value: value.to_owned(),
        });
    }

    Ok(digits.parse::<i64>().unwrap_or(i64::MAX))
}

/// Parses the `page` parameter of the listing, which is 1-based.
pub fn parse_page_number(raw: Option<&str>) -> Result<u32, BackendError> {
    let invalid = |value: &str| BackendError::InvalidParameter {
        name: "page",
        value: value.to_owned(),
    };

    match raw {
        None => Ok(1),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(invalid(value)),
            Ok(page) => Ok(page),
        },
    }
}

/// Parses the `title` parameter of a search. The term is normalized
/// like stored titles, so surrounding whitespace is dropped and a
/// whitespace-only term counts as missing rather than matching every
/// title with a space in it.
pub fn parse_search_term(raw: Option<&str>) -> Result<String, BackendError> {
    let term = raw.map(normalize_text).unwrap_or_default();

    if term.is_empty() {
        Err(BackendError::MissingParameter("title"))
    } else {
        Ok(term)
    }
}

/// Validates and stores a new song with a zero play counter.
pub async fn create_song(db: &SafeDb, submission: SongSubmission) -> Result<Song, BackendError> {
    let song = NewSong::try_from(submission)?;

    db.insert_song(song).await
}

/// Records a play of a song by `user` and bumps the song's counter in
/// the same unit of work.
pub async fn record_play(
    db: &SafeDb,
    user: UserId,
    submission: PlaySubmission,
) -> Result<Play, BackendError> {
    db.insert_play(NewPlay::new(user, submission)).await
}

/// Replaces the guess tallies of a play record. The song's counter is
/// untouched.
pub async fn update_play(
    db: &SafeDb,
    id: PlayId,
    update: PlayUpdate,
) -> Result<Play, BackendError> {
    db.update_play(id, update).await
}

/// Removes a play record without decrementing the song's counter.
pub async fn delete_play(db: &SafeDb, id: PlayId) -> Result<(), BackendError> {
    db.delete_play(id).await
}

/// Picks one stored song uniformly at random.
pub async fn random_song(db: &SafeDb) -> Result<Song, BackendError> {
    db.retrieve_random_song().await?.ok_or(BackendError::NoSongs)
}

/// Returns the `count` most played songs, most played first.
pub async fn top_songs(db: &SafeDb, count: i64) -> Result<Vec<Song>, BackendError> {
    db.retrieve_top_songs(count).await
}

/// Returns the songs whose titles contain `term`, ignoring case. An
/// empty result is reported as an error.
pub async fn search_songs(db: &SafeDb, term: &str) -> Result<Vec<Song>, BackendError> {
    let songs = db.search_songs(term).await?;

    if songs.is_empty() {
        Err(BackendError::NoMatches(term.to_owned()))
    } else {
        Ok(songs)
    }
}

/// Returns the given page of the song listing, in ID order.
pub async fn list_songs(db: &SafeDb, number: u32) -> Result<Page, BackendError> {
    if number == 0 {
        return Err(BackendError::InvalidPage(number));
    }

    let count = db.count_songs().await?;
    let offset = i64::from(number - 1) * PAGE_SIZE;

    // the first page always exists, even when it's empty
    if number > 1 && offset >= count {
        return Err(BackendError::InvalidPage(number));
    }

    let results = db.retrieve_songs(offset, PAGE_SIZE).await?;

    Ok(Page {
        count,
        number,
        has_next: offset + PAGE_SIZE < count,
        results,
    })
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::db::memory::MemoryDb;
    use crate::errors::ErrorKind;
    use crate::song::tests::submission;

    async fn seeded(count: i64) -> MemoryDb {
        let db = MemoryDb::new();

        for i in 0..count {
            let song = db
                .insert_song(NewSong::try_from(submission(&format!("Test Song {}", i))).unwrap())
                .await
                .unwrap();
            db.set_play_count(song.id, i).unwrap();
        }

        db
    }

    fn titles(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(|s| s.title.as_str()).collect()
    }

    fn play(song: i64) -> PlaySubmission {
        PlaySubmission {
            song,
            correct_guesses: 2,
            wrong_guesses: 0,
        }
    }

    #[test]
    fn top_count_parsing() {
        assert_eq!(parse_top_count(None).unwrap(), 3);
        assert_eq!(parse_top_count(Some("4")).unwrap(), 4);
        assert_eq!(parse_top_count(Some("0")).unwrap(), 0);
        assert_eq!(parse_top_count(Some("4294967296")).unwrap(), 4_294_967_296);
        assert_eq!(
            parse_top_count(Some("99999999999999999999999")).unwrap(),
            i64::MAX
        );

        for bad in &["invalid", "-1", "", "2.5", "+3"] {
            let error = parse_top_count(Some(*bad)).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidArgument, "{:?}", bad);
        }
    }

    #[test]
    fn page_parsing() {
        assert_eq!(parse_page_number(None).unwrap(), 1);
        assert_eq!(parse_page_number(Some("2")).unwrap(), 2);
        assert!(parse_page_number(Some("0")).is_err());
        assert!(parse_page_number(Some("last")).is_err());
    }

    #[test]
    fn search_term_parsing() {
        assert_eq!(parse_search_term(Some(" 5 ")).unwrap(), "5");
        assert!(matches!(
            parse_search_term(None),
            Err(BackendError::MissingParameter("title"))
        ));
        assert!(matches!(
            parse_search_term(Some("  ")),
            Err(BackendError::MissingParameter("title"))
        ));
    }

    #[tokio::test]
    async fn ranking_and_search_over_seeded_catalog() {
        let db = seeded(15).await;

        let top = top_songs(&db, parse_top_count(None).unwrap()).await.unwrap();
        assert_eq!(titles(&top), vec!["Test Song 14", "Test Song 13", "Test Song 12"]);

        let top = top_songs(&db, parse_top_count(Some("4")).unwrap()).await.unwrap();
        assert_eq!(
            titles(&top),
            vec!["Test Song 14", "Test Song 13", "Test Song 12", "Test Song 11"]
        );

        let everything = top_songs(&db, parse_top_count(Some("99999999999")).unwrap())
            .await
            .unwrap();
        assert_eq!(everything.len(), 15);
        assert_eq!(everything[0].title, "Test Song 14");

        let found = search_songs(&db, "5").await.unwrap();
        assert_eq!(titles(&found), vec!["Test Song 5"]);

        let found = search_songs(&db, "test song 1").await.unwrap();
        assert_eq!(found.len(), 6);

        let error = search_songs(&db, "Nonexistent").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn random_pick_needs_songs() {
        let db = MemoryDb::new();

        let error = random_song(&db).await.unwrap_err();
        assert!(matches!(error, BackendError::NoSongs));
        assert_eq!(error.to_string(), "No songs available");

        let db = seeded(5).await;
        for _ in 0..20 {
            let song = random_song(&db).await.unwrap();
            assert_eq!(db.retrieve_song(song.id).await.unwrap(), Some(song));
        }
    }

    #[tokio::test]
    async fn pages_hold_ten_songs() {
        let db = seeded(15).await;

        let first = list_songs(&db, 1).await.unwrap();
        assert_eq!(first.count, 15);
        assert_eq!(first.results.len(), 10);
        assert!(first.has_next);
        assert_eq!(first.results[0].title, "Test Song 0");

        let second = list_songs(&db, 2).await.unwrap();
        assert_eq!(second.results.len(), 5);
        assert!(!second.has_next);
        assert_eq!(second.results[0].title, "Test Song 10");

        assert!(matches!(
            list_songs(&db, 3).await,
            Err(BackendError::InvalidPage(3))
        ));

        let empty = list_songs(&MemoryDb::new(), 1).await.unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.results.is_empty());
    }

    #[tokio::test]
    async fn invalid_song_is_not_stored() {
        let db = MemoryDb::new();
        let mut s = submission("Invalid Language");
        s.language = "XX".to_owned();

        let error = create_song(&db, s).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(db.count_songs().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn play_of_missing_song_is_a_reference_error() {
        let db = MemoryDb::new();
        let (user, _) = db.create_user("ghostuser").await.unwrap();

        let error = record_play(&db, user.id, play(9999)).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Reference);
        assert!(db.retrieve_plays().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_plays_are_all_counted() {
        const PLAYERS: i64 = 50;

        let db = Arc::new(MemoryDb::new());
        let song = create_song(&*db, submission("Contended")).await.unwrap();
        let song_id = song.id;
        let mut users = vec![];
        for i in 0..PLAYERS {
            users.push(db.create_user(&format!("player{}", i)).await.unwrap().0);
        }

        let handles: Vec<_> = users
            .into_iter()
            .map(|user| {
                let db = db.clone();
                tokio::spawn(async move { record_play(&*db, user.id, play(song_id)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let song = db.retrieve_song(song.id).await.unwrap().unwrap();
        assert_eq!(song.number_times_played, PLAYERS);
        assert_eq!(db.retrieve_plays().await.unwrap().len(), PLAYERS as usize);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64, ..ProptestConfig::default()
        })]

        #[test]
        fn counter_grows_by_exactly_the_number_of_plays(initial in 0i64..1000, plays in 0usize..40) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("build runtime");

            let (before, after) = runtime.block_on(async {
                let db = MemoryDb::new();
                let song = create_song(&db, submission("Counted")).await.unwrap();
                db.set_play_count(song.id, initial).unwrap();
                let (user, _) = db.create_user("counter").await.unwrap();

                for _ in 0..plays {
                    record_play(&db, user.id, play(song.id)).await.unwrap();
                }

                let after = db.retrieve_song(song.id).await.unwrap().unwrap();
                (initial, after.number_times_played)
            });

            prop_assert_eq!(after - before, plays as i64);
        }
    }
}
