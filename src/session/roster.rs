use serde::Serialize;

use super::media::{MediaTrack, TrackKind};

/// A peer in the session with the latest camera and microphone tracks
/// received from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteParticipant {
    pub identity: String,
    pub video: Option<MediaTrack>,
    pub audio: Option<MediaTrack>,
}

impl RemoteParticipant {
    fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            video: None,
            audio: None,
        }
    }

    fn slot_mut(&mut self, kind: TrackKind) -> &mut Option<MediaTrack> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        }
    }
}

/// Outcome of [`ParticipantRoster::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Replaced,
}

/// Remote participants in order of first appearance.
///
/// Updating a participant's track never moves it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParticipantRoster {
    entries: Vec<RemoteParticipant>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `track` for `identity`, replacing the previous track of the
    /// same kind or appending a new participant.
    pub fn upsert(&mut self, identity: &str, track: MediaTrack) -> Upsert {
        let kind = track.kind;
        match self.entries.iter_mut().find(|p| p.identity == identity) {
            Some(existing) => {
                *existing.slot_mut(kind) = Some(track);
                Upsert::Replaced
            }
            None => {
                let mut participant = RemoteParticipant::new(identity);
                *participant.slot_mut(kind) = Some(track);
                self.entries.push(participant);
                Upsert::Added
            }
        }
    }

    /// Forget the track `sid` of `identity`. The participant stays listed.
    pub fn clear_track(&mut self, identity: &str, sid: &str) -> bool {
        let Some(participant) = self.entries.iter_mut().find(|p| p.identity == identity) else {
            return false;
        };
        for slot in [&mut participant.video, &mut participant.audio] {
            if slot.as_ref().is_some_and(|t| t.sid == sid) {
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn remove(&mut self, identity: &str) -> Option<RemoteParticipant> {
        let idx = self.entries.iter().position(|p| p.identity == identity)?;
        Some(self.entries.remove(idx))
    }

    pub fn get(&self, identity: &str) -> Option<&RemoteParticipant> {
        self.entries.iter().find(|p| p.identity == identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteParticipant> {
        self.entries.iter()
    }

    pub fn identities(&self) -> Vec<&str> {
        self.entries.iter().map(|p| p.identity.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
