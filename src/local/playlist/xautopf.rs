//! MusicBee auto-playlists (`.xautopf`): rule-driven playlists stored as
//! XML.
//!
//! The rules (comparers, limiter, sorter) are read to evaluate the playlist
//! against the library. On save only `Description`, `ExceptionsInclude` and
//! `Exceptions` are rewritten; the rule XML passes through untouched.

use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Context, eyre};
use color_eyre::{Result, Section};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::field::Field;
use crate::local::playlist::{LocalSyncResult, prepare_paths_for_output, result_from_paths};
use crate::local::track::LocalTrack;
use crate::processor::compare::{Comparer, Condition};
use crate::processor::filter::TrackFilter;
use crate::processor::limit::{LimitKind, LimitSort, Limiter};
use crate::processor::sort::Sorter;

#[derive(Debug, Clone)]
pub struct XAutoPfPlaylist {
    pub path: Utf8PathBuf,
    pub name: String,
    pub description: Option<String>,
    pub tracks: Vec<LocalTrack>,
    filter: TrackFilter,
    limiter: Option<Limiter>,
    sorter: Sorter,
    raw_xml: String,
    /// Snapshot of the evaluated tracks from the last load/save, used to
    /// derive the exception lists on save.
    original_tracks: Vec<LocalTrack>,
}

impl XAutoPfPlaylist {
    pub fn load(
        path: &Utf8Path,
        universe: &[LocalTrack],
        library_folder: Option<&Utf8Path>,
        other_folders: &[Utf8PathBuf],
        check_existence: bool,
    ) -> Result<Self> {
        let raw_xml = fs::read_to_string(path)
            .wrap_err("Failed to read auto-playlist from disk")
            .with_note(|| format!("path: {path}"))?;
        let rules = parse_rules(&raw_xml)
            .wrap_err("Failed to parse auto-playlist rules")
            .with_note(|| format!("path: {path}"))?;

        let filter = TrackFilter::new(
            rules.comparers,
            rules.match_all,
            rules.include,
            rules.exclude,
            library_folder.map(Utf8Path::to_path_buf),
            other_folders,
            check_existence,
        );

        let mut playlist = XAutoPfPlaylist {
            path: path.to_path_buf(),
            name: path.file_stem().unwrap_or("unnamed").to_string(),
            description: rules.description,
            tracks: Vec::new(),
            filter,
            limiter: rules.limiter,
            sorter: rules.sorter,
            raw_xml,
            original_tracks: Vec::new(),
        };
        playlist.tracks = playlist.evaluate(universe)?;
        playlist.original_tracks = playlist.tracks.clone();
        Ok(playlist)
    }

    /// Run the rules over ``universe``: filter, then limit (explicit
    /// includes survive the limiter), then sort.
    pub fn evaluate(&self, universe: &[LocalTrack]) -> Result<Vec<LocalTrack>> {
        let mut pool = universe.to_vec();
        Sorter::sort_by_field(&mut pool, Field::LastPlayed, true);
        let reference = pool.first().cloned();

        let mut tracks = self.filter.evaluate(&pool, reference.as_ref())?;
        if let Some(limiter) = &self.limiter {
            limiter.limit(&mut tracks, &self.filter.include_set());
        }
        self.sorter.sort(&mut tracks);
        Ok(tracks)
    }

    /// Update the exception lists from the current tracks and rewrite the
    /// playlist file.
    pub fn save(&mut self, dry_run: bool) -> Result<LocalSyncResult> {
        let start_paths: HashSet<String> = self
            .original_tracks
            .iter()
            .map(|track| track.path.as_str().to_lowercase())
            .collect();
        let final_paths: HashSet<String> = self
            .tracks
            .iter()
            .map(|track| track.path.as_str().to_lowercase())
            .collect();

        // re-run the comparers over the previous snapshot to find what the
        // rules alone would select now
        let compared: HashSet<String> = {
            let mut pool = self.original_tracks.clone();
            Sorter::sort_by_field(&mut pool, Field::LastPlayed, true);
            let reference = pool.first().cloned();
            let mut matched = HashSet::new();
            for track in &pool {
                if self.filter.compared(track, reference.as_ref())? {
                    matched.insert(track.path.as_str().to_lowercase());
                }
            }
            matched
        };

        // in the playlist but not selected by the rules -> explicit include;
        // selected by the rules but not in the playlist -> explicit exclude
        let include: Vec<&LocalTrack> = self
            .tracks
            .iter()
            .filter(|track| !compared.contains(&track.path.as_str().to_lowercase()))
            .collect();
        let exclude: Vec<&LocalTrack> = self
            .original_tracks
            .iter()
            .filter(|track| {
                let path = track.path.as_str().to_lowercase();
                compared.contains(&path) && !final_paths.contains(&path)
            })
            .collect();

        let include_out = prepare_paths_for_output(
            &self.filter,
            include.iter().map(|track| track.path.as_path()),
        );
        let exclude_out = prepare_paths_for_output(
            &self.filter,
            exclude.iter().map(|track| track.path.as_path()),
        );

        let updated = rewrite_xml(
            &self.raw_xml,
            self.description.as_deref(),
            &include_out,
            &exclude_out,
        )?;

        if !dry_run {
            fs::write(&self.path, &updated)
                .wrap_err("Failed to write auto-playlist to disk")
                .with_note(|| format!("path: {}", self.path))?;
            self.raw_xml = updated;
        }

        self.original_tracks = self.tracks.clone();
        Ok(result_from_paths(&start_paths, &final_paths))
    }
}

#[derive(Debug, Default)]
struct ParsedRules {
    description: Option<String>,
    match_all: bool,
    comparers: Vec<Comparer>,
    include: Vec<String>,
    exclude: Vec<String>,
    limiter: Option<Limiter>,
    sorter: Sorter,
}

fn attr_value(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.wrap_err("Malformed XML attribute")?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Attributes named `Value`, `Value2`, ... in attribute order.
fn condition_values(element: &BytesStart<'_>) -> Result<Vec<String>> {
    let mut values = Vec::new();
    for attr in element.attributes() {
        let attr = attr.wrap_err("Malformed XML attribute")?;
        if attr.key.as_ref().starts_with(b"Value") {
            values.push(attr.unescape_value()?.into_owned());
        }
    }
    Ok(values)
}

fn parse_rules(xml: &str) -> Result<ParsedRules> {
    let mut reader = Reader::from_str(xml);
    let mut rules = ParsedRules::default();
    let mut text_target: Option<&'static str> = None;

    loop {
        match reader.read_event().wrap_err("Invalid XML")? {
            Event::Start(e) | Event::Empty(e) => {
                text_target = None;
                match e.name().as_ref() {
                    b"Conditions" => {
                        rules.match_all = attr_value(&e, b"CombineMethod")?.as_deref() == Some("All");
                    }
                    b"Condition" => {
                        let field_name = attr_value(&e, b"Field")?
                            .ok_or_else(|| eyre!("Condition without a Field attribute"))?;
                        let comparison = attr_value(&e, b"Comparison")?
                            .ok_or_else(|| eyre!("Condition without a Comparison attribute"))?;

                        let field = Field::from_musicbee(&field_name)?;
                        let condition = Condition::from_name(&comparison)?;
                        let mut expected = condition_values(&e)?;
                        if expected.first().map(String::as_str) == Some("[playing track]") {
                            expected.clear();
                        }
                        rules.comparers.push(Comparer::new(field, condition, expected));
                    }
                    b"Limit" => {
                        if attr_value(&e, b"Enabled")?.as_deref() == Some("True") {
                            let max = attr_value(&e, b"Count")?
                                .and_then(|count| count.parse().ok())
                                .unwrap_or(0);
                            let kind = match attr_value(&e, b"Type")? {
                                Some(name) => LimitKind::from_name(&name)?,
                                None => LimitKind::Items,
                            };
                            let pre_sort = attr_value(&e, b"SelectedBy")?
                                .and_then(|name| LimitSort::from_name(&name).ok());
                            // MusicBee allows roughly a quarter over on time and
                            // byte limits
                            rules.limiter = Some(Limiter {
                                max,
                                kind,
                                pre_sort,
                                allowance: 1.25,
                            });
                        }
                    }
                    b"SortBy" | b"DefinedSort" => {
                        if let Some(field_name) = attr_value(&e, b"Field")?
                            && let Ok(field) = Field::from_musicbee(&field_name)
                        {
                            let reverse = attr_value(&e, b"Order")?.as_deref() == Some("Descending");
                            rules.sorter = Sorter::new(vec![(field, reverse)]);
                        }
                    }
                    b"Description" => text_target = Some("description"),
                    b"ExceptionsInclude" => text_target = Some("include"),
                    b"Exceptions" => text_target = Some("exclude"),
                    _ => {}
                }
            }
            Event::Text(text) => {
                let value = text.unescape().wrap_err("Invalid XML text")?;
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match text_target {
                    Some("description") => rules.description = Some(value.to_string()),
                    Some("include") => {
                        rules.include = value.split('|').map(str::to_string).collect();
                    }
                    Some("exclude") => {
                        rules.exclude = value.split('|').map(str::to_string).collect();
                    }
                    _ => {}
                }
            }
            Event::End(_) => text_target = None,
            Event::Eof => break,
            _ => {}
        }
    }

    // a playlist with no explicit rules still carries one allow-everything
    // comparer; drop it so evaluation can skip the comparer pass
    if let [only] = rules.comparers.as_slice()
        && only.condition == Condition::Contains
        && only.expected_raw().iter().all(String::is_empty)
        && !only.needs_reference()
    {
        rules.comparers.clear();
    }

    Ok(rules)
}

/// Copy the stored XML through, replacing only the description and the two
/// exception lists. Empty lists drop their element; missing elements with
/// content are inserted before `</Source>`.
fn rewrite_xml(
    xml: &str,
    description: Option<&str>,
    include: &[String],
    exclude: &[String],
) -> Result<String> {
    let include_text = include.join("|");
    let exclude_text = exclude.join("|");

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut wrote_include = false;
    let mut wrote_exclude = false;

    loop {
        let event = reader.read_event().wrap_err("Invalid XML")?;
        match event {
            Event::Start(ref e) => match e.name().as_ref() {
                b"Description" => {
                    reader.read_to_end(e.name()).wrap_err("Unclosed Description")?;
                    write_text_element(&mut writer, "Description", description.unwrap_or(""))?;
                }
                b"ExceptionsInclude" => {
                    reader
                        .read_to_end(e.name())
                        .wrap_err("Unclosed ExceptionsInclude")?;
                    wrote_include = true;
                    if !include_text.is_empty() {
                        write_text_element(&mut writer, "ExceptionsInclude", &include_text)?;
                    }
                }
                b"Exceptions" => {
                    reader.read_to_end(e.name()).wrap_err("Unclosed Exceptions")?;
                    wrote_exclude = true;
                    if !exclude_text.is_empty() {
                        write_text_element(&mut writer, "Exceptions", &exclude_text)?;
                    }
                }
                _ => writer.write_event(event)?,
            },
            Event::Empty(ref e) => match e.name().as_ref() {
                b"Description" => {
                    write_text_element(&mut writer, "Description", description.unwrap_or(""))?;
                }
                b"ExceptionsInclude" => {
                    wrote_include = true;
                    if !include_text.is_empty() {
                        write_text_element(&mut writer, "ExceptionsInclude", &include_text)?;
                    }
                }
                b"Exceptions" => {
                    wrote_exclude = true;
                    if !exclude_text.is_empty() {
                        write_text_element(&mut writer, "Exceptions", &exclude_text)?;
                    }
                }
                _ => writer.write_event(event)?,
            },
            Event::End(ref e) => {
                if e.name().as_ref() == b"Source" {
                    if !wrote_include && !include_text.is_empty() {
                        write_text_element(&mut writer, "ExceptionsInclude", &include_text)?;
                        wrote_include = true;
                    }
                    if !wrote_exclude && !exclude_text.is_empty() {
                        write_text_element(&mut writer, "Exceptions", &exclude_text)?;
                        wrote_exclude = true;
                    }
                }
                writer.write_event(event)?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    String::from_utf8(writer.into_inner()).wrap_err("Rewritten XML is not UTF-8")
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
