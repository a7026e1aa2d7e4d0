use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{Result, Section, eyre::Context};
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::read_from_path;
use lofty::tag::{Accessor, ItemKey, ItemValue, Tag, TagExt, TagItem};

use crate::field::Field;
use crate::scan::{
    FileProps, FormatScanner, TagWriteResult, TrackTags, WriteReason, open_exclusive,
};

pub struct Scanner;

impl Scanner {
    pub const fn new() -> Self {
        Scanner
    }
}

impl FormatScanner for Scanner {
    fn scan(&self, path: Utf8PathBuf) -> Result<Option<(TrackTags, FileProps)>> {
        let tagged_file = read_from_path(&path)
            .wrap_err("Could not open file for reading metadata")
            .with_note(|| format!("path is: {path}"))?;

        let properties = tagged_file.properties();
        let props = FileProps {
            channels: properties.channels(),
            bit_rate: properties.audio_bitrate(),
            bit_depth: properties.bit_depth(),
            sample_rate: properties.sample_rate(),
            length: Some(properties.duration().as_secs_f64()),
            ..Default::default()
        };

        let Some(tag) = tagged_file.primary_tag() else {
            return Ok(Some((TrackTags::default(), props)));
        };

        let tags = TrackTags {
            title: tag.title().map(|v| v.to_string()),
            artist: tag.artist().map(|v| v.to_string()),
            album: tag.album().map(|v| v.to_string()),
            album_artist: tag.get_string(&ItemKey::AlbumArtist).map(str::to_string),
            track_number: tag.track(),
            track_total: tag.track_total(),
            disc_number: tag.disk(),
            disc_total: tag.disk_total(),
            year: tag.year().map(|y| y as i32),
            bpm: tag.get_string(&ItemKey::Bpm).and_then(|v| v.parse().ok()),
            key: tag.get_string(&ItemKey::InitialKey).map(str::to_string),
            genres: tag.get_strings(&ItemKey::Genre).map(str::to_string).collect(),
            comments: tag.get_strings(&ItemKey::Comment).map(str::to_string).collect(),
            compilation: tag.get_string(&ItemKey::FlagCompilation) == Some("1"),
            // TODO: read POPM/rating frames once a cross-format mapping is settled
            rating: None,
            images: tag.pictures().iter().map(|p| p.data().to_vec()).collect(),
        };
        Ok(Some((tags, props)))
    }
}

/// Apply ``tags`` to the file's primary tag.
pub fn write(
    path: &Utf8Path,
    tags: &TrackTags,
    replace: bool,
    dry_run: bool,
) -> Result<TagWriteResult> {
    let mut tagged_file = read_from_path(path)
        .wrap_err("Could not open file for writing metadata")
        .with_note(|| format!("path is: {path}"))?;
    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.primary_tag().is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .primary_tag_mut()
        .expect("primary tag was just inserted");

    let mut result = TagWriteResult::default();
    set_string(tag, Field::Title, tags.title.as_deref(), replace, &mut result);
    set_string(tag, Field::Artist, tags.artist.as_deref(), replace, &mut result);
    set_string(tag, Field::Album, tags.album.as_deref(), replace, &mut result);
    set_string(tag, Field::AlbumArtist, tags.album_artist.as_deref(), replace, &mut result);
    set_string(tag, Field::Key, tags.key.as_deref(), replace, &mut result);

    set_number(tag, Field::TrackNumber, tags.track_number, replace, &mut result);
    set_number(tag, Field::TrackTotal, tags.track_total, replace, &mut result);
    set_number(tag, Field::DiscNumber, tags.disc_number, replace, &mut result);
    set_number(tag, Field::DiscTotal, tags.disc_total, replace, &mut result);
    set_number(tag, Field::Year, tags.year.map(|y| y as u32), replace, &mut result);

    let bpm = tags.bpm.map(|b| b.round().to_string());
    set_string(tag, Field::Bpm, bpm.as_deref(), replace, &mut result);

    set_list(tag, Field::Genres, &tags.genres, replace, &mut result);
    set_list(tag, Field::Comments, &tags.comments, replace, &mut result);

    let current = tag.get_string(&ItemKey::FlagCompilation) == Some("1");
    if tags.compilation != current && (replace || tags.compilation) {
        if tags.compilation {
            tag.insert_text(ItemKey::FlagCompilation, "1".to_string());
            result.updated.insert(Field::Compilation, WriteReason::Added);
        } else {
            tag.remove_key(&ItemKey::FlagCompilation);
            result.updated.insert(Field::Compilation, WriteReason::Removed);
        }
    }

    if result.updated.is_empty() {
        return Ok(result);
    }
    if !dry_run {
        let mut file = open_exclusive(path)?;
        tag.save_to(&mut file, WriteOptions::default())
            .wrap_err("Could not save tags to file")
            .with_note(|| format!("path is: {path}"))?;
        result.saved = true;
    }
    Ok(result)
}

/// Remove the given fields from the file's primary tag.
pub fn delete(path: &Utf8Path, fields: &[Field], dry_run: bool) -> Result<TagWriteResult> {
    let mut tagged_file = read_from_path(path)
        .wrap_err("Could not open file for deleting metadata")
        .with_note(|| format!("path is: {path}"))?;
    let Some(tag) = tagged_file.primary_tag_mut() else {
        return Ok(TagWriteResult::default());
    };

    let mut result = TagWriteResult::default();
    for field in fields {
        let keys = item_keys(*field);
        let present = keys.iter().any(|key| tag.get(key).is_some());
        if !present {
            continue;
        }
        for key in keys {
            tag.remove_key(key);
        }
        result.updated.insert(*field, WriteReason::Removed);
    }

    if result.updated.is_empty() {
        return Ok(result);
    }
    if !dry_run {
        let mut file = open_exclusive(path)?;
        tag.save_to(&mut file, WriteOptions::default())
            .wrap_err("Could not save tags to file")
            .with_note(|| format!("path is: {path}"))?;
        result.saved = true;
    }
    Ok(result)
}

/// The container-native keys backing each writable field, constant per
/// format by way of lofty's key mapping.
fn item_keys(field: Field) -> &'static [ItemKey] {
    match field {
        Field::Title => &[ItemKey::TrackTitle],
        Field::Artist => &[ItemKey::TrackArtist],
        Field::Album => &[ItemKey::AlbumTitle],
        Field::AlbumArtist => &[ItemKey::AlbumArtist],
        Field::TrackNumber => &[ItemKey::TrackNumber],
        Field::TrackTotal => &[ItemKey::TrackTotal],
        Field::DiscNumber => &[ItemKey::DiscNumber],
        Field::DiscTotal => &[ItemKey::DiscTotal],
        Field::Year => &[ItemKey::Year, ItemKey::RecordingDate],
        Field::Bpm => &[ItemKey::Bpm],
        Field::Key => &[ItemKey::InitialKey],
        Field::Genres => &[ItemKey::Genre],
        Field::Comments => &[ItemKey::Comment],
        Field::Compilation => &[ItemKey::FlagCompilation],
        _ => &[],
    }
}

fn set_string(
    tag: &mut Tag,
    field: Field,
    value: Option<&str>,
    replace: bool,
    result: &mut TagWriteResult,
) {
    // the first key is the write target, the rest are delete-only aliases
    let Some(key) = item_keys(field).first() else {
        return;
    };
    let current = tag.get_string(key).map(str::to_string);

    match (value, current) {
        (Some(new), None) => {
            tag.insert_text(key.clone(), new.to_string());
            result.updated.insert(field, WriteReason::Added);
        }
        (Some(new), Some(old)) if replace && new != old => {
            tag.insert_text(key.clone(), new.to_string());
            result.updated.insert(field, WriteReason::Replaced);
        }
        (None, Some(_)) if replace => {
            tag.remove_key(key);
            result.updated.insert(field, WriteReason::Removed);
        }
        _ => {}
    }
}

fn set_number(
    tag: &mut Tag,
    field: Field,
    value: Option<u32>,
    replace: bool,
    result: &mut TagWriteResult,
) {
    set_string(tag, field, value.map(|v| v.to_string()).as_deref(), replace, result);
}

fn set_list(
    tag: &mut Tag,
    field: Field,
    values: &[String],
    replace: bool,
    result: &mut TagWriteResult,
) {
    let Some(key) = item_keys(field).first() else {
        return;
    };
    let current: Vec<String> = tag.get_strings(key).map(str::to_string).collect();

    if current.is_empty() && !values.is_empty() {
        replace_strings(tag, key, values);
        result.updated.insert(field, WriteReason::Added);
    } else if replace && current != values {
        if values.is_empty() {
            tag.remove_key(key);
            result.updated.insert(field, WriteReason::Removed);
        } else {
            replace_strings(tag, key, values);
            result.updated.insert(field, WriteReason::Replaced);
        }
    }
}

fn replace_strings(tag: &mut Tag, key: &ItemKey, values: &[String]) {
    tag.remove_key(key);
    for value in values {
        tag.push(TagItem::new(key.clone(), ItemValue::Text(value.clone())));
    }
}
