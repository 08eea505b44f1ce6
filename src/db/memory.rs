use std::collections::{BTreeMap, HashMap};

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use rand::seq::IteratorRandom;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::Db;
use crate::errors::BackendError;
use crate::play::{NewPlay, Play, PlayId, PlayUpdate, Times};
use crate::song::{NewSong, Song, SongId};
use crate::user::{User, UserId};

/// A catalog held entirely in memory.
///
/// Every operation runs under one lock, which makes each of them
/// atomic, including the two writes of `insert_play`.
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    songs: BTreeMap<SongId, Song>,
    plays: BTreeMap<PlayId, Play>,
    users: HashMap<Uuid, User>,
    last_song_id: SongId,
    last_play_id: PlayId,
    last_user_id: UserId,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a song's counter, bypassing play records. Used to
    /// seed rankings.
    pub fn set_play_count(&self, id: SongId, count: i64) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let song = state
            .songs
            .get_mut(&id)
            .ok_or(BackendError::NonExistentSong(id))?;

        song.number_times_played = count;

        Ok(())
    }

    fn with_state<T: Send + 'static>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, BackendError>,
    ) -> BoxFuture<Result<T, BackendError>> {
        let result = f(&mut self.state.lock());

        future::ready(result).boxed()
    }
}

impl Db for MemoryDb {
    fn count_songs(&self) -> BoxFuture<Result<i64, BackendError>> {
        self.with_state(|state| Ok(state.songs.len() as i64))
    }

    fn create_user(&self, username: &str) -> BoxFuture<Result<(User, Uuid), BackendError>> {
        let username = username.to_owned();

        self.with_state(move |state| {
            if state.users.values().any(|u| u.username == username) {
                return Err(BackendError::UsernameAlreadyExists);
            }

            state.last_user_id += 1;
            let user = User {
                id: state.last_user_id,
                username,
            };
            let token = Uuid::new_v4();
            state.users.insert(token, user.clone());

            Ok((user, token))
        })
    }

    fn delete_play(&self, id: PlayId) -> BoxFuture<Result<(), BackendError>> {
        self.with_state(move |state| {
            state
                .plays
                .remove(&id)
                .map(|_| ())
                .ok_or(BackendError::NonExistentPlay(id))
        })
    }

    fn insert_play(&self, play: NewPlay) -> BoxFuture<Result<Play, BackendError>> {
        self.with_state(move |state| {
            let song = state
                .songs
                .get_mut(&play.song)
                .ok_or(BackendError::NonExistentSong(play.song))?;
            song.number_times_played += 1;

            state.last_play_id += 1;
            let created = Play {
                id: state.last_play_id,
                song: play.song,
                user: play.user,
                correct_guesses: play.correct_guesses,
                wrong_guesses: play.wrong_guesses,
                times: Times::now(),
            };
            state.plays.insert(created.id, created.clone());

            Ok(created)
        })
    }

    fn insert_song(&self, song: NewSong) -> BoxFuture<Result<Song, BackendError>> {
        self.with_state(move |state| {
            state.last_song_id += 1;
            let song = song.into_song(state.last_song_id);
            state.songs.insert(song.id, song.clone());

            Ok(song)
        })
    }

    fn retrieve_play(&self, id: PlayId) -> BoxFuture<Result<Option<Play>, BackendError>> {
        self.with_state(move |state| Ok(state.plays.get(&id).cloned()))
    }

    fn retrieve_plays(&self) -> BoxFuture<Result<Vec<Play>, BackendError>> {
        self.with_state(|state| Ok(state.plays.values().cloned().collect()))
    }

    fn retrieve_random_song(&self) -> BoxFuture<Result<Option<Song>, BackendError>> {
        self.with_state(|state| {
            let mut rng = rand::thread_rng();

            Ok(state.songs.values().choose(&mut rng).cloned())
        })
    }

    fn retrieve_song(&self, id: SongId) -> BoxFuture<Result<Option<Song>, BackendError>> {
        self.with_state(move |state| Ok(state.songs.get(&id).cloned()))
    }

    fn retrieve_songs(
        &self,
        offset: i64,
        limit: i64,
    ) -> BoxFuture<Result<Vec<Song>, BackendError>> {
        self.with_state(move |state| {
            Ok(state
                .songs
                .values()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .cloned()
                .collect())
        })
    }

    fn retrieve_top_songs(&self, limit: i64) -> BoxFuture<Result<Vec<Song>, BackendError>> {
        self.with_state(move |state| {
            // `songs` iterates in ID order and the sort is stable, so ties
            // keep ascending IDs
            let mut songs: Vec<Song> = state.songs.values().cloned().collect();
            songs.sort_by(|a, b| b.number_times_played.cmp(&a.number_times_played));
            songs.truncate(limit.max(0) as usize);

            Ok(songs)
        })
    }

    fn retrieve_user_by_token(
        &self,
        token: &Uuid,
    ) -> BoxFuture<Result<Option<User>, BackendError>> {
        let token = *token;

        self.with_state(move |state| Ok(state.users.get(&token).cloned()))
    }

    fn search_songs(&self, term: &str) -> BoxFuture<Result<Vec<Song>, BackendError>> {
        let term = term.to_lowercase();

        self.with_state(move |state| {
            Ok(state
                .songs
                .values()
                .filter(|s| s.title.to_lowercase().contains(&term))
                .cloned()
                .collect())
        })
    }

    fn update_play(
        &self,
        id: PlayId,
        update: PlayUpdate,
    ) -> BoxFuture<Result<Play, BackendError>> {
        self.with_state(move |state| {
            let play = state
                .plays
                .get_mut(&id)
                .ok_or(BackendError::NonExistentPlay(id))?;

            play.correct_guesses = update.correct_guesses;
            play.wrong_guesses = update.wrong_guesses;
            play.times.updated_at = OffsetDateTime::now_utc();

            Ok(play.clone())
        })
    }
}
