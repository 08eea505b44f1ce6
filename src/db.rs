use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::play::{NewPlay, Play, PlayId, PlayUpdate};
use crate::song::{NewSong, Song, SongId};
use crate::user::User;

pub mod memory;

/// Durable storage for songs, play records and accounts.
///
/// `insert_play` is the only operation that touches two rows: it must
/// add the record and bump the song's counter as one unit, so that
/// concurrent callers never lose an increment and a missing song
/// leaves nothing behind.
pub trait Db {
    fn count_songs(&self) -> BoxFuture<Result<i64, BackendError>>;

    fn create_user(&self, username: &str) -> BoxFuture<Result<(User, Uuid), BackendError>>;

    /// Removes a play record. The song's counter is left as it is.
    fn delete_play(&self, id: PlayId) -> BoxFuture<Result<(), BackendError>>;

    fn insert_play(&self, play: NewPlay) -> BoxFuture<Result<Play, BackendError>>;

    fn insert_song(&self, song: NewSong) -> BoxFuture<Result<Song, BackendError>>;

    fn retrieve_play(&self, id: PlayId) -> BoxFuture<Result<Option<Play>, BackendError>>;

    fn retrieve_plays(&self) -> BoxFuture<Result<Vec<Play>, BackendError>>;

    fn retrieve_random_song(&self) -> BoxFuture<Result<Option<Song>, BackendError>>;

    fn retrieve_song(&self, id: SongId) -> BoxFuture<Result<Option<Song>, BackendError>>;

    /// Returns songs in ascending ID order.
    fn retrieve_songs(&self, offset: i64, limit: i64)
        -> BoxFuture<Result<Vec<Song>, BackendError>>;

    /// Returns the most played songs, ties going to the older song.
    fn retrieve_top_songs(&self, limit: i64) -> BoxFuture<Result<Vec<Song>, BackendError>>;

    fn retrieve_user_by_token(&self, token: &Uuid)
        -> BoxFuture<Result<Option<User>, BackendError>>;

    /// Returns songs whose titles contain `term`, ignoring case, in
    /// ascending ID order.
    fn search_songs(&self, term: &str) -> BoxFuture<Result<Vec<Song>, BackendError>>;

    fn update_play(&self, id: PlayId, update: PlayUpdate)
        -> BoxFuture<Result<Play, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use std::convert::TryFrom;
    use std::str::FromStr;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use uuid::Uuid;

    use crate::errors::BackendError;
    use crate::play::{NewPlay, Play, PlayId, PlayUpdate, Times};
    use crate::song::{NewSong, Song, SongId};
    use crate::user::User;

    const SONG_USERS_SONG_CONSTRAINT: &str = "song_users_song";
    const USERS_USERNAME_CONSTRAINT: &str = "users_username";
    const SONGS_CONSTRAINT_PREFIX: &str = "songs_";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are usable with `dyn`
    impl super::Db for PgDb {
        fn count_songs(&self) -> BoxFuture<Result<i64, BackendError>> {
            async move {
                let query = sqlx::query_as::<_, (i64,)>(include_str!("queries/count_songs.sql"));

                let (count,) = query.fetch_one(&self.pool).await.map_err(map_sqlx_error)?;

                Ok(count)
            }
            .boxed()
        }

        fn create_user(&self, username: &str) -> BoxFuture<Result<(User, Uuid), BackendError>> {
            let username = username.to_owned();

            async move {
                let token = Uuid::new_v4();
                let query = sqlx::query_as(include_str!("queries/create_user.sql"));

                let (id,): (i64,) = query
                    .bind(&username)
                    .bind(token)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok((User { id, username }, token))
            }
            .boxed()
        }

        fn delete_play(&self, id: PlayId) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/delete_play.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentPlay(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn insert_play(&self, play: NewPlay) -> BoxFuture<Result<Play, BackendError>> {
            async move {
                let song = play.song;
                let map_error = |e: sqlx::Error| match e {
                    sqlx::Error::Database(ref d)
                        if d.constraint() == Some(SONG_USERS_SONG_CONSTRAINT) =>
                    {
                        BackendError::NonExistentSong(song)
                    }
                    e => map_sqlx_error(e),
                };

                let mut transaction = self.pool.begin().await.map_err(map_sqlx_error)?;

                // the row lock taken here serializes concurrent plays of
                // the same song until this transaction ends
                let incremented = sqlx::query(include_str!("queries/increment_play_count.sql"))
                    .bind(song)
                    .execute(&mut *transaction)
                    .await
                    .map_err(map_error)?
                    .rows_affected();

                if incremented == 0 {
                    // dropping `transaction` rolls it back
                    return Err(BackendError::NonExistentSong(song));
                }

                let created = sqlx::query(include_str!("queries/create_play.sql"))
                    .bind(song)
                    .bind(play.user)
                    .bind(i64::from(play.correct_guesses))
                    .bind(i64::from(play.wrong_guesses))
                    .try_map(|row: PgRow| play_from_row(&row))
                    .fetch_one(&mut *transaction)
                    .await
                    .map_err(map_error)?;

                transaction.commit().await.map_err(map_sqlx_error)?;

                Ok(created)
            }
            .boxed()
        }

        fn insert_song(&self, song: NewSong) -> BoxFuture<Result<Song, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_song.sql"));

                let (id,): (SongId,) = query
                    .bind(&song.title)
                    .bind(&song.artist)
                    .bind(song.language.code())
                    .bind(song.category.code())
                    .bind(&song.audio_file)
                    .bind(&song.lrc_file)
                    .bind(&song.background_image)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(song.into_song(id))
            }
            .boxed()
        }

        fn retrieve_play(&self, id: PlayId) -> BoxFuture<Result<Option<Play>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_play.sql"));

                let play = query
                    .bind(id)
                    .try_map(|row: PgRow| play_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(play)
            }
            .boxed()
        }

        fn retrieve_plays(&self) -> BoxFuture<Result<Vec<Play>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_plays.sql"));

                let plays = query
                    .try_map(|row: PgRow| play_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(plays)
            }
            .boxed()
        }

        fn retrieve_random_song(&self) -> BoxFuture<Result<Option<Song>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_random_song.sql"));

                let song = query
                    .try_map(|row: PgRow| song_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(song)
            }
            .boxed()
        }

        fn retrieve_song(&self, id: SongId) -> BoxFuture<Result<Option<Song>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_song.sql"));

                let song = query
                    .bind(id)
                    .try_map(|row: PgRow| song_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(song)
            }
            .boxed()
        }

        fn retrieve_songs(
            &self,
            offset: i64,
            limit: i64,
        ) -> BoxFuture<Result<Vec<Song>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_songs.sql"));

                let songs = query
                    .bind(limit)
                    .bind(offset)
                    .try_map(|row: PgRow| song_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(songs)
            }
            .boxed()
        }

        fn retrieve_top_songs(&self, limit: i64) -> BoxFuture<Result<Vec<Song>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_top_songs.sql"));

                let songs = query
                    .bind(limit)
                    .try_map(|row: PgRow| song_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(songs)
            }
            .boxed()
        }

        fn retrieve_user_by_token(
            &self,
            token: &Uuid,
        ) -> BoxFuture<Result<Option<User>, BackendError>> {
            let token = *token;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_user_by_token.sql"));

                let user = query
                    .bind(token)
                    .try_map(|row: PgRow| {
                        Ok(User {
                            id: try_get(&row, "id")?,
                            username: try_get(&row, "username")?,
                        })
                    })
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(user)
            }
            .boxed()
        }

        fn search_songs(&self, term: &str) -> BoxFuture<Result<Vec<Song>, BackendError>> {
            let pattern = escape_like(term);

            async move {
                let query = sqlx::query(include_str!("queries/search_songs.sql"));

                let songs = query
                    .bind(pattern)
                    .try_map(|row: PgRow| song_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(songs)
            }
            .boxed()
        }

        fn update_play(
            &self,
            id: PlayId,
            update: PlayUpdate,
        ) -> BoxFuture<Result<Play, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/update_play.sql"));

                let play = query
                    .bind(id)
                    .bind(i64::from(update.correct_guesses))
                    .bind(i64::from(update.wrong_guesses))
                    .try_map(|row: PgRow| play_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                play.ok_or(BackendError::NonExistentPlay(id))
            }
            .boxed()
        }
    }

    fn song_from_row(row: &PgRow) -> Result<Song, sqlx::Error> {
        let language: String = try_get(row, "language")?;
        let category: String = try_get(row, "category")?;

        Ok(Song {
            id: try_get(row, "id")?,
            title: try_get(row, "title")?,
            artist: try_get(row, "artist")?,
            language: decode_choice(&language)?,
            category: decode_choice(&category)?,
            number_times_played: try_get(row, "number_times_played")?,
            audio_file: try_get(row, "audio_file")?,
            lrc_file: try_get(row, "lrc_file")?,
            background_image: try_get(row, "background_image")?,
        })
    }

    fn play_from_row(row: &PgRow) -> Result<Play, sqlx::Error> {
        Ok(Play {
            id: try_get(row, "id")?,
            song: try_get(row, "song_id")?,
            user: try_get(row, "user_id")?,
            correct_guesses: decode_tally(try_get(row, "correct_guesses")?)?,
            wrong_guesses: decode_tally(try_get(row, "wrong_guesses")?)?,
            times: Times {
                created_at: try_get(row, "created_at")?,
                updated_at: try_get(row, "updated_at")?,
            },
        })
    }

    // the check constraints keep both of these from failing unless the
    // schema and the enums drift apart
    fn decode_choice<T: FromStr<Err = BackendError>>(value: &str) -> Result<T, sqlx::Error> {
        value.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    fn decode_tally(value: i64) -> Result<u32, sqlx::Error> {
        u32::try_from(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::Row;

        row.try_get(column)
    }

    /// Escapes the `LIKE` wildcards in a user-supplied search term.
    pub(crate) fn escape_like(term: &str) -> String {
        term.replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_")
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.constraint() == Some(USERS_USERNAME_CONSTRAINT) => {
                BackendError::UsernameAlreadyExists
            }
            Error::Database(ref e)
                if e.constraint()
                    .map_or(false, |c| c.starts_with(SONGS_CONSTRAINT_PREFIX)) =>
            {
                let constraint = e.constraint().unwrap_or_default().to_owned();
                BackendError::ConstraintViolated(constraint)
            }
            _ => BackendError::Sqlx { source: error },
        }
    }

    #[cfg(test)]
    mod tests {
        use super::escape_like;

        #[test]
        fn like_wildcards_are_escaped() {
            assert_eq!(escape_like("100%"), "100\\%");
            assert_eq!(escape_like("a_b"), "a\\_b");
            assert_eq!(escape_like("back\\slash"), "back\\\\slash");
            assert_eq!(escape_like("Test Song 5"), "Test Song 5");
        }
    }
}
