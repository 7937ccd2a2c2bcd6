//! Tagged on-disk encoding of the model.
//!
//! Every map-like value is written as `{"dataType": "Map", "value": [[k, v], ...]}`
//! and every entity as `{"dataType": "<Entity>", "value": {...}}`. Sets are
//! maps whose values are all `null`. Decoding is forgiving: a malformed map
//! entry is skipped and a malformed field falls back to its default, so one
//! bad record never costs its siblings.

use std::collections::{BTreeMap, BTreeSet};

use ringvc_shared::{ChannelId, GroupId, Mode, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::filter::Filter;
use crate::roster::ChannelRoster;
use crate::settings::UserSettings;
use crate::state::State;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "dataType", content = "value")]
enum MapNode<K, V> {
    Map(Vec<(K, V)>),
}

type SetNode<T> = MapNode<T, ()>;

/// A map wrapper whose entries have not been decoded yet.
#[derive(Debug, Deserialize)]
#[serde(tag = "dataType", content = "value")]
enum RawMap {
    Map(Vec<Value>),
}

/// A scalar field kept raw when it does not decode, so the caller can
/// report it with the owning entity.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Checked<T> {
    Valid(T),
    Invalid(Value),
}

impl<T: Default> Default for Checked<T> {
    fn default() -> Self {
        Checked::Valid(T::default())
    }
}

impl<K, V> Default for MapNode<K, V> {
    fn default() -> Self {
        MapNode::Map(Vec::new())
    }
}

impl<K, V> MapNode<K, V> {
    fn entries(self) -> Vec<(K, V)> {
        match self {
            MapNode::Map(entries) => entries,
        }
    }
}

impl<K: Clone, V: Clone> MapNode<K, V> {
    fn from_map<'a>(map: impl IntoIterator<Item = (&'a K, &'a V)>) -> Self
    where
        K: 'a,
        V: 'a,
    {
        MapNode::Map(map.into_iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl<T: Clone> MapNode<T, ()> {
    fn from_set<'a>(set: impl IntoIterator<Item = &'a T>) -> Self
    where
        T: 'a,
    {
        MapNode::Map(set.into_iter().map(|item| (item.clone(), ())).collect())
    }

    fn into_set(self) -> BTreeSet<T>
    where
        T: Ord,
    {
        self.entries().into_iter().map(|(item, ())| item).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "dataType", content = "value")]
enum FilterNode {
    #[serde(rename = "VoiceChannelFilter")]
    Filter(FilterRecord),
}

impl Default for FilterNode {
    fn default() -> Self {
        FilterNode::from(&Filter::default())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterRecord {
    is_whitelist: bool,
    #[serde(default, deserialize_with = "lenient_map")]
    list: SetNode<UserId>,
}

impl From<&Filter> for FilterNode {
    fn from(filter: &Filter) -> Self {
        FilterNode::Filter(FilterRecord {
            is_whitelist: filter.is_whitelist(),
            list: MapNode::from_set(filter.members()),
        })
    }
}

impl From<FilterNode> for Filter {
    fn from(node: FilterNode) -> Self {
        let FilterNode::Filter(record) = node;
        Filter::from_parts(record.is_whitelist, record.list.into_set())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "dataType", content = "value")]
enum UserNode {
    #[serde(rename = "DiscordUser")]
    User(UserRecord),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    user_id: UserId,
    #[serde(default, deserialize_with = "lenient_map")]
    voice_channels: MapNode<ChannelId, FilterNode>,
    #[serde(default, deserialize_with = "lenient")]
    global_filter: FilterNode,
    #[serde(default)]
    mode: Checked<Mode>,
    #[serde(default, deserialize_with = "lenient_map")]
    channel_auto_ring_enabled: MapNode<ChannelId, bool>,
    #[serde(default, deserialize_with = "lenient")]
    global_auto_ring_enabled: bool,
    #[serde(default, deserialize_with = "lenient_map")]
    default_ringee_user_ids: MapNode<ChannelId, UserSet>,
    #[serde(default, deserialize_with = "lenient_map")]
    global_default_ringee_user_ids: SetNode<UserId>,
}

impl UserRecord {
    fn new(id: &UserId, settings: &UserSettings) -> Self {
        Self {
            user_id: id.clone(),
            voice_channels: MapNode::Map(
                settings
                    .channel_filters
                    .iter()
                    .map(|(channel, filter)| (channel.clone(), FilterNode::from(filter)))
                    .collect(),
            ),
            global_filter: FilterNode::from(&settings.global_filter),
            mode: Checked::Valid(settings.mode),
            channel_auto_ring_enabled: MapNode::from_map(&settings.channel_auto_ring),
            global_auto_ring_enabled: settings.global_auto_ring,
            default_ringee_user_ids: MapNode::Map(
                settings
                    .channel_defaults
                    .iter()
                    .map(|(channel, users)| (channel.clone(), UserSet(MapNode::from_set(users))))
                    .collect(),
            ),
            global_default_ringee_user_ids: MapNode::from_set(&settings.global_defaults),
        }
    }

    fn into_settings(self) -> (UserId, UserSettings) {
        let mode = match self.mode {
            Checked::Valid(mode) => mode,
            Checked::Invalid(raw) => {
                warn!(user = %self.user_id, value = %raw, "Unknown mode in data file, using normal");
                Mode::default()
            }
        };
        let settings = UserSettings {
            global_filter: self.global_filter.into(),
            channel_filters: self
                .voice_channels
                .entries()
                .into_iter()
                .map(|(channel, node)| (channel, node.into()))
                .collect(),
            mode,
            channel_auto_ring: self.channel_auto_ring_enabled.entries().into_iter().collect(),
            global_auto_ring: self.global_auto_ring_enabled,
            channel_defaults: self
                .default_ringee_user_ids
                .entries()
                .into_iter()
                .map(|(channel, UserSet(users))| (channel, users.into_set()))
                .filter(|(_, users)| !users.is_empty())
                .collect(),
            global_defaults: self.global_default_ringee_user_ids.into_set(),
        };
        (self.user_id, settings)
    }
}

/// A nested set of users, decoded member by member.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
struct UserSet(#[serde(deserialize_with = "lenient_map")] SetNode<UserId>);

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "dataType", content = "value")]
enum RosterNode {
    #[serde(rename = "VoiceChat")]
    Roster(RosterRecord),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterRecord {
    channel_id: ChannelId,
    #[serde(default, deserialize_with = "lenient_map")]
    user_ids: SetNode<UserId>,
    #[serde(default, deserialize_with = "lenient_map")]
    role_ids: SetNode<GroupId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Root {
    voice_chats: MapNode<ChannelId, RosterNode>,
    users: MapNode<UserId, UserNode>,
}

/// Decodes a field, falling back to its default when the value has the
/// wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(&value).unwrap_or_else(|e| {
        warn!(error = %e, "Malformed field in data file, using default");
        T::default()
    }))
}

/// Decodes a map wrapper entry by entry. Entries whose key or value has the
/// wrong shape are dropped; a wrapper that is not a map at all is empty.
fn lenient_map<'de, D, K, V>(deserializer: D) -> std::result::Result<MapNode<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let entries = raw_entries(&value).unwrap_or_else(|e| {
        warn!(error = %e, "Malformed map in data file, using empty map");
        Vec::new()
    });
    let kept = entries
        .into_iter()
        .filter_map(|entry| match <(K, V)>::deserialize(&entry) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!(entry = %entry, error = %e, "Skipping malformed map entry");
                None
            }
        })
        .collect();
    Ok(MapNode::Map(kept))
}

fn raw_entries(value: &Value) -> serde_json::Result<Vec<Value>> {
    let RawMap::Map(entries) = RawMap::deserialize(value)?;
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Serialises the model, leaving out default users and empty rosters.
pub fn encode(state: &State) -> Result<String> {
    let root = Root {
        voice_chats: MapNode::Map(
            state
                .rosters()
                .filter(|(_, roster)| !roster.is_empty())
                .map(|(channel, roster)| {
                    let record = RosterRecord {
                        channel_id: channel.clone(),
                        user_ids: MapNode::from_set(roster.users()),
                        role_ids: MapNode::from_set(roster.groups()),
                    };
                    (channel.clone(), RosterNode::Roster(record))
                })
                .collect(),
        ),
        users: MapNode::Map(
            state
                .users()
                .filter(|(_, settings)| !settings.is_default())
                .map(|(id, settings)| (id.clone(), UserNode::User(UserRecord::new(id, settings))))
                .collect(),
        ),
    };
    Ok(serde_json::to_string(&root)?)
}

/// Rebuilds the model from file contents.
///
/// Fails only when the text is not JSON at all. Entities that decode to
/// their defaults are not materialised.
pub fn decode(text: &str) -> Result<State> {
    let root: Value = serde_json::from_str(text)?;

    let mut rosters = BTreeMap::new();
    for (key, node) in table(&root, "voiceChats") {
        match RosterNode::deserialize(&node) {
            Ok(RosterNode::Roster(record)) => {
                let roster = ChannelRoster {
                    users: record.user_ids.into_set(),
                    groups: record.role_ids.into_set(),
                };
                if roster.is_empty() {
                    debug!(channel = %record.channel_id, "Skipping empty roster");
                    continue;
                }
                rosters.insert(record.channel_id, roster);
            }
            Err(e) => warn!(key = %key, error = %e, "Skipping malformed roster entry"),
        }
    }

    let mut users = BTreeMap::new();
    for (key, node) in table(&root, "users") {
        match UserNode::deserialize(&node) {
            Ok(UserNode::User(record)) => {
                let (id, settings) = record.into_settings();
                if id.as_str().is_empty() || settings.is_default() {
                    debug!(user = %id, "Skipping default user");
                    continue;
                }
                users.insert(id, settings);
            }
            Err(e) => warn!(key = %key, error = %e, "Skipping malformed user entry"),
        }
    }

    Ok(State::from_parts(users, rosters))
}

fn table(root: &Value, name: &str) -> Vec<(Value, Value)> {
    let Some(node) = root.get(name) else {
        return Vec::new();
    };
    let entries = match raw_entries(node) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(table = name, error = %e, "Ignoring malformed table");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match <(Value, Value)>::deserialize(&entry) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!(table = name, entry = %entry, error = %e, "Skipping malformed table entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringvc_shared::{FilterKind, Scope};
    use tracing_test::traced_test;

    fn sample_state() -> State {
        let mut state = State::detached();
        let chan = ChannelId::from("100");
        let alice = UserId::from("1");

        state.edit_roster(&chan, |r| {
            r.add_user(alice.clone());
            r.add_group(GroupId::from("900"));
        });
        state.edit_user(&alice, |s| {
            s.filter_mut(&Scope::Global).add(UserId::from("2"));
            let channel_filter = s.filter_mut(&Scope::Channel(chan.clone()));
            channel_filter.set_kind(FilterKind::Whitelist);
            channel_filter.add(UserId::from("3"));
            s.set_mode(Mode::Auto);
            s.set_auto_ring(&Scope::Channel(chan.clone()), true);
            s.add_default_recipient(&Scope::Global, UserId::from("4"));
            s.add_default_recipient(&Scope::Channel(chan.clone()), UserId::from("5"));
        });
        state
    }

    #[test]
    fn test_round_trip_preserves_non_default_entities() {
        let state = sample_state();
        let decoded = decode(&encode(&state).unwrap()).unwrap();

        let original: Vec<_> = state.users().collect();
        let restored: Vec<_> = decoded.users().collect();
        assert_eq!(original, restored);

        let original: Vec<_> = state.rosters().collect();
        let restored: Vec<_> = decoded.rosters().collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_wire_shape() {
        let text = encode(&sample_state()).unwrap();
        let root: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(root["users"]["dataType"], "Map");
        let user = &root["users"]["value"][0][1];
        assert_eq!(user["dataType"], "DiscordUser");
        assert_eq!(user["value"]["mode"], "auto");
        assert_eq!(user["value"]["globalFilter"]["dataType"], "VoiceChannelFilter");
        assert_eq!(
            user["value"]["globalFilter"]["value"]["list"]["value"][0],
            serde_json::json!(["2", null])
        );
        assert_eq!(root["voiceChats"]["value"][0][1]["dataType"], "VoiceChat");
    }

    #[test]
    fn test_default_entities_are_not_materialised() {
        let text = r#"{
            "voiceChats": {"dataType": "Map", "value": [
                ["7", {"dataType": "VoiceChat", "value": {
                    "channelId": "7",
                    "userIds": {"dataType": "Map", "value": []}
                }}]
            ]},
            "users": {"dataType": "Map", "value": [
                ["1", {"dataType": "DiscordUser", "value": {
                    "userId": "1",
                    "voiceChannels": {"dataType": "Map", "value": []},
                    "globalFilter": {"dataType": "VoiceChannelFilter", "value": {
                        "isWhitelist": false,
                        "list": {"dataType": "Map", "value": []}
                    }},
                    "mode": "normal",
                    "defaultRingeeUserIds": {"dataType": "Map", "value": []},
                    "globalDefaultRingeeUserIds": {"dataType": "Map", "value": []}
                }}]
            ]}
        }"#;
        let state = decode(text).unwrap();
        assert_eq!(state.users().count(), 0);
        assert_eq!(state.rosters().count(), 0);
    }

    #[test]
    fn test_malformed_wrappers_fall_back_to_defaults() {
        let text = r#"{
            "users": {"dataType": "Map", "value": [
                ["1", {"dataType": "DiscordUser", "value": {
                    "userId": "1",
                    "globalFilter": {"dataType": "Nope", "value": {}},
                    "mode": "stealth",
                    "globalDefaultRingeeUserIds": [1, 2, 3]
                }}],
                ["2", {"dataType": "SomethingElse", "value": {}}],
                ["3", "garbage"]
            ]},
            "voiceChats": 42
        }"#;
        let state = decode(text).unwrap();

        let settings = state.user(&UserId::from("1")).unwrap();
        assert_eq!(settings.mode(), Mode::Stealth);
        assert!(settings.global_filter().is_default());
        assert!(settings.global_defaults().is_empty());
        assert_eq!(state.users().count(), 1);
        assert_eq!(state.rosters().count(), 0);
    }

    #[test]
    fn test_bad_map_entry_keeps_its_siblings() {
        let text = r#"{
            "users": {"dataType": "Map", "value": [
                ["1", {"dataType": "DiscordUser", "value": {
                    "userId": "1",
                    "voiceChannels": {"dataType": "Map", "value": [
                        ["good", {"dataType": "VoiceChannelFilter", "value": {
                            "isWhitelist": true,
                            "list": {"dataType": "Map", "value": [["9", null], [false, null]]}
                        }}],
                        ["bad", {"dataType": "Nope"}]
                    ]},
                    "defaultRingeeUserIds": {"dataType": "Map", "value": [
                        ["7", {"dataType": "Map", "value": [["4", null], [{}, null]]}],
                        [12]
                    ]}
                }}]
            ]}
        }"#;
        let state = decode(text).unwrap();
        let settings = state.user(&UserId::from("1")).unwrap();

        let filters = settings.channel_filters();
        assert_eq!(filters.len(), 1);
        let good = &filters[&ChannelId::from("good")];
        assert!(good.is_whitelist());
        assert_eq!(good.members().iter().collect::<Vec<_>>(), vec![&UserId::from("9")]);

        let defaults = settings.default_recipients(&Scope::Channel(ChannelId::from("7")));
        assert_eq!(defaults, Some(&BTreeSet::from([UserId::from("4")])));
    }

    #[test]
    #[traced_test]
    fn test_unknown_mode_is_reported_with_its_user() {
        let text = r#"{
            "users": {"dataType": "Map", "value": [
                ["42", {"dataType": "DiscordUser", "value": {
                    "userId": "42",
                    "mode": "loud",
                    "globalAutoRingEnabled": true
                }}]
            ]}
        }"#;
        let state = decode(text).unwrap();

        let settings = state.user(&UserId::from("42")).unwrap();
        assert_eq!(settings.mode(), Mode::Normal);
        assert!(settings.global_auto_ring());
        assert!(logs_contain("Unknown mode in data file"));
        assert!(logs_contain("user=42"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(decode("{not json").is_err());
    }
}
