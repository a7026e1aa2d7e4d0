//! Interactive checking of URI assignments via temporary remote playlists.
//!
//! For each collection a temporary playlist is created from the items that
//! already carry a URI. The user edits those playlists on the remote side
//! (swapping wrong matches for right ones), then the session reconciles the
//! edits back onto the source items, prompting for anything it cannot match.

use std::collections::HashMap;

use color_eyre::Result;
use tracing::{debug, info, warn};

use crate::item::UriState;
use crate::local::TrackCollection;
use crate::matcher::{MatchField, Matcher};
use crate::remote::api::RemoteApi;
use crate::remote::id::{self, ObjectKind};
use crate::remote::playlist::RemotePlaylist;
use crate::remote::track::RemoteTrack;
use crate::report;
use crate::util::{align_and_truncate, max_width};

/// Source of user input, injectable so tests can script a session.
pub trait Prompt {
    fn input(&mut self, message: &str) -> Result<String>;
    fn show(&mut self, text: &str);
}

/// Reads lines from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn input(&mut self, message: &str) -> Result<String> {
        use std::io::Write;
        print!("{message}: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn show(&mut self, text: &str) {
        println!("{text}");
    }
}

/// The aggregated outcome of a completed check session, by item name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResult {
    pub switched: Vec<String>,
    pub unavailable: Vec<String>,
    pub unchanged: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Creating,
    AwaitingInput,
    Reconciling,
    CleaningUp,
    Done,
    Quitting,
}

/// Everything a running check session owns. Temporary playlists are always
/// deleted before the session ends, whichever way it ends.
struct Session {
    state: SessionState,
    /// (collection name, temp playlist url, collection index)
    playlists: Vec<(String, String, usize)>,
    skip: bool,
    quit: bool,
    /// Indices into the current collection still needing a decision.
    remaining: Vec<usize>,
    switched: Vec<String>,
    final_switched: Vec<String>,
    final_unavailable: Vec<String>,
    final_unchanged: Vec<String>,
}

impl Session {
    fn new() -> Self {
        Session {
            state: SessionState::Creating,
            playlists: Vec::new(),
            skip: false,
            quit: false,
            remaining: Vec::new(),
            switched: Vec::new(),
            final_switched: Vec::new(),
            final_unavailable: Vec::new(),
            final_unchanged: Vec::new(),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "check session state");
        self.state = state;
    }

    async fn delete_temp_playlists(&mut self, api: &dyn RemoteApi) {
        if self.playlists.is_empty() {
            return;
        }
        self.set_state(SessionState::CleaningUp);
        info!("deleting {} temporary playlists", self.playlists.len());
        for (name, url, _) in self.playlists.drain(..) {
            if let Err(error) = api.delete_playlist(&url).await {
                warn!(playlist = %name, %error, "failed to delete temporary playlist");
            }
        }
    }

    fn finalise(&mut self) -> CheckResult {
        self.set_state(SessionState::Done);
        let result = CheckResult {
            switched: std::mem::take(&mut self.final_switched),
            unavailable: std::mem::take(&mut self.final_unavailable),
            unchanged: std::mem::take(&mut self.final_unchanged),
        };
        report::log_check_result(&result);
        result
    }
}

enum InputOutcome {
    Done,
    /// The user fixed the remote playlist; reconcile it again.
    Recheck,
    Stop,
}

pub struct Checker<'a, P: Prompt> {
    pub api: &'a dyn RemoteApi,
    pub matcher: Matcher,
    pub prompt: P,
    /// Pause for user input after this many playlists have been created.
    pub interval: usize,
}

impl<'a, P: Prompt> Checker<'a, P> {
    pub fn new(api: &'a dyn RemoteApi, prompt: P) -> Self {
        Checker {
            api,
            matcher: Matcher::default(),
            prompt,
            interval: 10,
        }
    }

    /// Run a full check session over ``collections``.
    ///
    /// Returns `None` when the user quit; otherwise the aggregated result.
    /// Temporary playlists are deleted in every case, including errors.
    pub async fn check(
        &mut self,
        collections: &mut [TrackCollection],
    ) -> Result<Option<CheckResult>> {
        if collections.iter().all(|collection| collection.is_empty()) {
            debug!("no items to check");
            return Ok(None);
        }
        debug!("checking items: start");
        info!(user = self.api.user_name(), "checking items via temporary playlists");

        let mut session = Session::new();
        let outcome = self.run_session(&mut session, collections).await;
        session.delete_temp_playlists(self.api).await;

        outcome?;
        let result = if session.quit {
            session.set_state(SessionState::Quitting);
            None
        } else {
            Some(session.finalise())
        };
        debug!("checking items: done");
        Ok(result)
    }

    async fn run_session(
        &mut self,
        session: &mut Session,
        collections: &mut [TrackCollection],
    ) -> Result<()> {
        let interval = self.interval.max(1);
        let pages_total = collections.len().div_ceil(interval);

        for index in 0..collections.len() {
            session.set_state(SessionState::Creating);
            self.make_temp_playlist(session, index, &collections[index]).await;
            if session.quit {
                return Ok(());
            }

            // keep creating until the pause interval is reached, except on
            // the last collection
            if session.playlists.len() % interval != 0 && index + 1 != collections.len() {
                continue;
            }

            session.set_state(SessionState::AwaitingInput);
            self.pause(session, collections, index / interval + 1, pages_total).await?;
            if !session.quit {
                session.set_state(SessionState::Reconciling);
                self.reconcile_collections(session, collections).await?;
            }

            session.delete_temp_playlists(self.api).await;
            if session.quit || session.skip {
                return Ok(());
            }
        }
        Ok(())
    }

    async fn make_temp_playlist(
        &mut self,
        session: &mut Session,
        index: usize,
        collection: &TrackCollection,
    ) {
        let uris = collection.uris();
        if uris.is_empty() {
            return;
        }

        let created = async {
            let url = self.api.create_playlist(&collection.name, false, false).await?;
            self.api.add_to_playlist(&url, &uris, false).await?;
            Ok::<_, crate::error::ApiError>(url)
        }
        .await;

        match created {
            Ok(url) => session.playlists.push((collection.name.clone(), url, index)),
            Err(error) => {
                // a failed creation ends the session; playlists created so
                // far still get deleted on the way out
                warn!(collection = %collection.name, %error, "could not create temporary playlist");
                session.quit = true;
            }
        }
    }

    fn pause_help(&self) -> String {
        let options = [
            ("<Return>", "continue and check for any changes made on the remote side"),
            ("<name of playlist>", "print the items originally added to that temporary playlist"),
            ("<link/URI/ID>", "print the tracks of the given remote object"),
            ("s", "check current playlists, then skip any remaining checks"),
            ("q", "delete current temporary playlists and quit the check"),
            ("h", "show this dialogue again"),
        ];
        format_help(&options)
    }

    async fn pause(
        &mut self,
        session: &mut Session,
        collections: &[TrackCollection],
        page: usize,
        pages_total: usize,
    ) -> Result<()> {
        let help = self.pause_help();
        self.prompt.show(&help);

        loop {
            let input = self.prompt.input(&format!("Enter ({page}/{pages_total})"))?;
            let input = input.trim();
            if input.is_empty() {
                return Ok(());
            }

            let lower = input.to_lowercase();
            if lower == "s" || lower == "q" {
                session.skip |= lower == "s";
                session.quit |= lower == "q";
                return Ok(());
            }
            if lower == "h" {
                self.prompt.show(&help);
                continue;
            }

            let named = session
                .playlists
                .iter()
                .find(|(name, _, _)| name.to_lowercase().contains(&lower));
            if let Some((name, _, index)) = named {
                let collection = &collections[*index];
                let lines: Vec<String> = collection
                    .tracks()
                    .iter()
                    .filter(|track| track.has_uri() == Some(true))
                    .enumerate()
                    .map(|(i, track)| {
                        format!(
                            "{:>4}: {} | {}",
                            i + 1,
                            track.name(),
                            track.uri().map(|uri| uri.as_str()).unwrap_or_default(),
                        )
                    })
                    .collect();
                self.prompt
                    .show(&format!("Items originally added to {name}:\n{}", lines.join("\n")));
                continue;
            }

            if id::validate_id_type(input, None) {
                self.print_remote_item(input).await;
                continue;
            }

            warn!("input not recognised");
        }
    }

    /// Pretty-print whatever remote object the user pasted.
    async fn print_remote_item(&mut self, value: &str) {
        let kind = id::parse(value)
            .and_then(|parsed| parsed.kind)
            .unwrap_or(ObjectKind::Track);

        match kind {
            ObjectKind::Playlist => match RemotePlaylist::fetch(self.api, value, false).await {
                Ok(playlist) => {
                    let lines: Vec<String> = playlist
                        .tracks
                        .iter()
                        .enumerate()
                        .map(|(i, track)| format!("{:>4}: {} | {}", i + 1, track.name, track.uri))
                        .collect();
                    self.prompt
                        .show(&format!("{}:\n{}", playlist.name, lines.join("\n")));
                }
                Err(error) => warn!(%error, "could not fetch playlist"),
            },
            kind => {
                match self
                    .api
                    .get_items(&[value.to_string()], kind, 1, false, false)
                    .await
                {
                    Ok(responses) => {
                        for response in responses {
                            let name = response["name"].as_str().unwrap_or("unknown");
                            let uri = response["uri"].as_str().unwrap_or_default();
                            self.prompt.show(&format!("{name} | {uri}"));
                        }
                    }
                    Err(error) => warn!(%error, "could not fetch item"),
                }
            }
        }
    }

    async fn reconcile_collections(
        &mut self,
        session: &mut Session,
        collections: &mut [TrackCollection],
    ) -> Result<()> {
        for (name, url, index) in session.playlists.clone() {
            let collection = &mut collections[index];
            debug!(collection = %name, total = collection.len(), "reconciling");

            loop {
                self.match_to_remote(session, &url, collection).await?;
                match self.match_to_input(session, &name, collection)? {
                    InputOutcome::Recheck => continue,
                    InputOutcome::Done | InputOutcome::Stop => {}
                }
                if session.remaining.is_empty() {
                    break;
                }
            }

            let unavailable: Vec<String> = collection
                .tracks()
                .iter()
                .filter(|track| track.has_uri() == Some(false))
                .map(|track| track.name().to_string())
                .collect();
            let unchanged: Vec<String> = collection
                .tracks()
                .iter()
                .filter(|track| track.has_uri().is_none())
                .map(|track| track.name().to_string())
                .collect();

            debug!(
                collection = %name,
                switched = session.switched.len(),
                unavailable = unavailable.len(),
                unchanged = unchanged.len(),
                "collection reconciled"
            );
            session.final_switched.append(&mut session.switched);
            session.final_unavailable.extend(unavailable);
            session.final_unchanged.extend(unchanged);

            if session.quit || session.skip {
                break;
            }
        }
        Ok(())
    }

    /// Compare the source collection against the current remote playlist and
    /// remap what the user switched. Anything still unresolved lands on
    /// `session.remaining` for the input stage.
    async fn match_to_remote(
        &mut self,
        session: &mut Session,
        url: &str,
        collection: &mut TrackCollection,
    ) -> Result<()> {
        let remote = RemotePlaylist::fetch(self.api, url, false).await?;

        let source_valid: Vec<(usize, crate::remote::Uri)> = collection
            .tracks()
            .iter()
            .enumerate()
            .filter_map(|(i, track)| track.uri().map(|uri| (i, uri.clone())))
            .collect();
        let remote_uris: Vec<&crate::remote::Uri> =
            remote.tracks.iter().map(|track| &track.uri).collect();

        let mut added: Vec<RemoteTrack> = remote
            .tracks
            .iter()
            .filter(|track| !source_valid.iter().any(|(_, uri)| *uri == track.uri))
            .cloned()
            .collect();
        let mut removed: Vec<usize> = source_valid
            .iter()
            .filter(|(_, uri)| !remote_uris.contains(&uri))
            .map(|(i, _)| *i)
            .collect();
        let mut missing: Vec<usize> = collection
            .tracks()
            .iter()
            .enumerate()
            .filter(|(_, track)| track.has_uri().is_none())
            .map(|(i, _)| i)
            .collect();

        if added.is_empty() && removed.is_empty() && missing.is_empty() {
            if source_valid.len() == remote_uris.len() {
                debug!("playlist unchanged and no missing URIs, skipping match");
                session.remaining.clear();
                return Ok(());
            }

            // the source held duplicate URIs and the user removed some of
            // the copies; find them through the count difference
            let mut remote_counts: HashMap<&crate::remote::Uri, usize> = HashMap::new();
            for uri in &remote_uris {
                *remote_counts.entry(uri).or_default() += 1;
            }
            let mut source_counts: HashMap<&crate::remote::Uri, usize> = HashMap::new();
            for (_, uri) in &source_valid {
                *source_counts.entry(uri).or_default() += 1;
            }
            for (uri, count) in source_counts {
                if remote_counts.get(uri).copied() != Some(count) {
                    missing.extend(
                        source_valid
                            .iter()
                            .filter(|(_, u)| u == uri)
                            .map(|(i, _)| *i),
                    );
                }
            }
            // map iteration order is arbitrary; prompt in list order
            missing.sort_unstable();
        }

        debug!(
            added = added.len(),
            removed = removed.len(),
            missing = missing.len(),
            difference = source_valid.len() as i64 - remote_uris.len() as i64,
            "remote playlist diff"
        );

        removed.append(&mut missing);
        let candidates_start = removed.len();
        let mut still_unmatched = Vec::new();
        for idx in removed {
            if added.is_empty() {
                still_unmatched.push(idx);
                continue;
            }
            let matched = self.matcher.score_match(
                &collection.tracks()[idx],
                &added,
                0.1,
                0.8,
                &[MatchField::Title],
            );
            match matched {
                Some(best) => {
                    let uri = added.remove(best).uri;
                    collection.tracks_mut()[idx].set_uri(UriState::Valid(uri));
                    session.switched.push(collection.tracks()[idx].name().to_string());
                }
                None => still_unmatched.push(idx),
            }
        }

        debug!(
            switched = candidates_start - still_unmatched.len(),
            unresolved = still_unmatched.len(),
            "remote match finished"
        );
        session.remaining = still_unmatched;
        Ok(())
    }

    fn input_help(&self, name: &str) -> String {
        let header = format!("{name}: the following items were removed and/or matches were not found.");
        let options = [
            ("u", "mark the item as unavailable on the remote service"),
            ("n", "leave the item with no URI, to be searched again next run"),
            ("a", "append to 'u' or 'n' to apply that choice to all remaining items"),
            ("r", "recheck the remote playlist for all items in this collection"),
            ("p", "print the local path of the current item"),
            ("s", "skip the checking process for all current playlists"),
            ("q", "skip the checking process and quit the check"),
            ("h", "show this dialogue again"),
        ];
        format!(
            "{header}\n{}OR enter a custom URI/URL/ID for this item\n",
            format_help(&options)
        )
    }

    /// Ask the user what to do with every item the remote pass could not
    /// resolve.
    fn match_to_input(
        &mut self,
        session: &mut Session,
        name: &str,
        collection: &mut TrackCollection,
    ) -> Result<InputOutcome> {
        if session.remaining.is_empty() {
            return Ok(InputOutcome::Done);
        }

        let help = self.input_help(name);
        self.prompt.show(&help);
        let width = max_width(
            session
                .remaining
                .iter()
                .map(|idx| collection.tracks()[*idx].name()),
        );

        let mut batch: Option<char> = None;
        for idx in session.remaining.clone() {
            loop {
                let input = match batch {
                    Some(choice) => choice.to_string(),
                    None => {
                        let item_name = collection.tracks()[idx].name().to_string();
                        self.prompt.input(&align_and_truncate(&item_name, width))?
                    }
                };
                let lower = input.trim().to_lowercase();

                match lower.as_str() {
                    "u" | "ua" => {
                        debug!(item = collection.tracks()[idx].name(), "marking as unavailable");
                        if lower.ends_with('a') {
                            batch = Some('u');
                        }
                        collection.tracks_mut()[idx].set_uri(UriState::Unavailable);
                        session.remaining.retain(|i| *i != idx);
                        break;
                    }
                    "n" | "na" => {
                        debug!(item = collection.tracks()[idx].name(), "leaving without URI");
                        if lower.ends_with('a') {
                            batch = Some('n');
                        }
                        collection.tracks_mut()[idx].set_uri(UriState::Missing);
                        session.remaining.retain(|i| *i != idx);
                        break;
                    }
                    "r" => {
                        debug!("rechecking the remote playlist");
                        return Ok(InputOutcome::Recheck);
                    }
                    "s" | "q" => {
                        session.skip |= lower == "s";
                        session.quit |= lower == "q";
                        session.remaining.clear();
                        return Ok(InputOutcome::Stop);
                    }
                    "h" => self.prompt.show(&help),
                    "p" => {
                        let path = collection.tracks()[idx].path.clone();
                        self.prompt.show(path.as_str());
                    }
                    _ => {
                        if id::validate_id_type(input.trim(), Some(ObjectKind::Track)) {
                            let uri = id::to_uri(input.trim(), ObjectKind::Track)?;
                            debug!(item = collection.tracks()[idx].name(), %uri, "updating URI");
                            collection.tracks_mut()[idx].set_uri(UriState::Valid(uri));
                            session.switched.push(collection.tracks()[idx].name().to_string());
                            session.remaining.retain(|i| *i != idx);
                            break;
                        }
                        // unrecognised input, ask again
                    }
                }
            }

            if session.remaining.is_empty() {
                break;
            }
        }
        Ok(InputOutcome::Done)
    }
}

fn format_help(options: &[(&str, &str)]) -> String {
    let width = max_width(options.iter().map(|(key, _)| *key));
    let mut help = String::from("Enter one of the following:\n");
    for (key, description) in options {
        help.push_str(&format!("\t{}: {}\n", align_and_truncate(key, width), description));
    }
    help
}
