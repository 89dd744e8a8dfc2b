use std::collections::HashMap;

use crate::{
    backend::VoiceBackend,
    models::{Candidate, VoicePostRow},
};

/// Object-storage bucket for profile images
pub const IMAGE_BUCKET: &str = "vlivers-images";

/// Object-storage bucket for voice clips
pub const VOICE_BUCKET: &str = "vlivers-voices";

/// Immutable candidate collection for one session
///
/// Holds the flat display list in server order plus an id lookup. Replaced
/// wholesale on reload; never mutated in between.
pub struct Catalog {
    candidates: Vec<Candidate>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        let by_id = candidates
            .iter()
            .enumerate()
            .map(|(index, c)| (c.id.clone(), index))
            .collect();
        Self { candidates, by_id }
    }

    /// Built-in sample deck, used when the backend yields nothing usable
    pub fn sample() -> Self {
        Self::from_candidates(sample_candidates())
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.by_id.get(id).map(|&index| &self.candidates[index])
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Loads the candidate catalog from the backend
///
/// Fetch failures and empty result sets both fall back to the built-in
/// sample deck, so the swipe surface is never empty on a fresh or
/// misconfigured backend.
pub async fn load_catalog(backend: &dyn VoiceBackend) -> Catalog {
    let rows = match backend.fetch_published_posts().await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, "Catalog fetch failed, using sample deck");
            return Catalog::sample();
        }
    };

    let total = rows.len();
    let candidates: Vec<Candidate> = rows
        .into_iter()
        .filter_map(|row| normalize_row(row, backend))
        .collect();

    if candidates.is_empty() {
        tracing::warn!(fetched = total, "No usable catalog rows, using sample deck");
        return Catalog::sample();
    }

    tracing::info!(
        candidate_count = candidates.len(),
        skipped = total - candidates.len(),
        "Catalog loaded"
    );

    Catalog::from_candidates(candidates)
}

/// Flattens one raw post row into a display candidate
///
/// Rows without a joined profile are dropped. Optional fields normalize to
/// empty collections/strings so downstream scoring never null-checks.
pub fn normalize_row(row: VoicePostRow, backend: &dyn VoiceBackend) -> Option<Candidate> {
    let profile = row.vliver_profiles?;

    let handle = match profile.handle.as_deref() {
        Some(h) if !h.is_empty() => format!("@{}", h),
        _ => String::new(),
    };

    let image_url = profile
        .image_path
        .as_deref()
        .map(|path| backend.resolve_storage_url(IMAGE_BUCKET, path))
        .unwrap_or_default();

    let audio_url = row
        .voice_path
        .as_deref()
        .map(|path| backend.resolve_storage_url(VOICE_BUCKET, path))
        .filter(|url| !url.is_empty());

    Some(Candidate {
        id: row.id,
        name: profile.name,
        handle,
        catchphrase: row.catch_copy.unwrap_or_default(),
        description: profile.description.unwrap_or_default(),
        image_url,
        audio_url,
        tags: profile.tags.unwrap_or_default(),
        color: profile.color.unwrap_or_default(),
        promoted: row.is_boosted,
    })
}

/// Sample deck shipped with the app
///
/// Absolute URLs pass straight through storage resolution.
fn sample_candidates() -> Vec<Candidate> {
    vec![
        Candidate {
            id: "akari".to_string(),
            name: "星咲 あかり".to_string(),
            handle: "@akari_hoshizaki".to_string(),
            catchphrase: "今日も一緒に輝こうね⭐".to_string(),
            description: "ゲーム実況とお歌が得意な天然系VTuber。毎日夜10時から配信中！初見さん大歓迎。"
                .to_string(),
            image_url: "https://picsum.photos/seed/akari/400/700".to_string(),
            audio_url: Some(
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3".to_string(),
            ),
            tags: vec!["歌".to_string(), "ゲーム".to_string(), "天然".to_string()],
            color: "#FF6B9D".to_string(),
            promoted: true,
        },
        Candidate {
            id: "rei".to_string(),
            name: "蒼天 レイ".to_string(),
            handle: "@rei_souten".to_string(),
            catchphrase: "深淵を覗く者よ、ようこそ。".to_string(),
            description: "ホラー・ミステリー系クールVライバー。低音ボイスで朗読・考察配信も担当。"
                .to_string(),
            image_url: "https://picsum.photos/seed/rei/400/700".to_string(),
            audio_url: Some(
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-2.mp3".to_string(),
            ),
            tags: vec!["ホラー".to_string(), "朗読".to_string(), "クール".to_string()],
            color: "#4A90D9".to_string(),
            promoted: false,
        },
        Candidate {
            id: "midori".to_string(),
            name: "翠葉 みどり".to_string(),
            handle: "@midori_suiha".to_string(),
            catchphrase: "ゆっくりまったり、一緒にいよう🌿".to_string(),
            description: "癒し系のんびりVライバー。料理配信・雑談・ASMR。日常の隙間に寄り添います。"
                .to_string(),
            image_url: "https://picsum.photos/seed/midori/400/700".to_string(),
            audio_url: Some(
                "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-3.mp3".to_string(),
            ),
            tags: vec!["癒し".to_string(), "ASMR".to_string(), "雑談".to_string()],
            color: "#52C788".to_string(),
            promoted: false,
        },
    ]
}
