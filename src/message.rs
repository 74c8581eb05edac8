//! A JMS-style message as seen by selectors: selectable headers plus properties
//!
//! Selectors can reference six header fields by name; every other identifier
//! names an application or provider property (`JMSX*` and `JMS_*` included).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, TimeZone};

use crate::eval::PropertySource;
use crate::value::Value;

pub const JMS_DELIVERY_MODE: &str = "JMSDeliveryMode";
pub const JMS_PRIORITY: &str = "JMSPriority";
pub const JMS_MESSAGE_ID: &str = "JMSMessageID";
pub const JMS_TIMESTAMP: &str = "JMSTimestamp";
pub const JMS_CORRELATION_ID: &str = "JMSCorrelationID";
pub const JMS_TYPE: &str = "JMSType";

/// Header fields a selector may reference
pub const SELECTABLE_HEADERS: [&str; 6] = [
    JMS_DELIVERY_MODE,
    JMS_PRIORITY,
    JMS_MESSAGE_ID,
    JMS_TIMESTAMP,
    JMS_CORRELATION_ID,
    JMS_TYPE,
];

pub const DEFAULT_PRIORITY: u8 = 4;

pub fn is_header_name(name: &str) -> bool {
    SELECTABLE_HEADERS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryMode {
    #[default]
    Persistent,
    NonPersistent,
}

impl DeliveryMode {
    /// Value seen by selectors comparing against `JMSDeliveryMode`
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Persistent => "PERSISTENT",
            DeliveryMode::NonPersistent => "NON_PERSISTENT",
        }
    }
}

impl Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "PERSISTENT" => Ok(DeliveryMode::Persistent),
            "NON_PERSISTENT" => Ok(DeliveryMode::NonPersistent),
            _ => Err(format!(
                "unknown delivery mode '{}' (expected PERSISTENT or NON_PERSISTENT)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    message_id: Option<String>,
    correlation_id: Option<String>,
    jms_type: Option<String>,
    priority: u8,
    delivery_mode: DeliveryMode,
    /// milliseconds since the Unix epoch
    timestamp: Option<i64>,
    properties: BTreeMap<String, Value>,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            message_id: None,
            correlation_id: None,
            jms_type: None,
            priority: DEFAULT_PRIORITY,
            delivery_mode: DeliveryMode::default(),
            timestamp: None,
            properties: BTreeMap::new(),
        }
    }
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_type(mut self, jms_type: impl Into<String>) -> Self {
        self.jms_type = Some(jms_type.into());
        self
    }

    /// JMS priorities run from 0 to 9; larger values are clamped to 9.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(9);
        self
    }

    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    pub fn with_timestamp<Tz: TimeZone>(self, at: DateTime<Tz>) -> Self {
        self.with_timestamp_millis(at.timestamp_millis())
    }

    pub fn with_timestamp_millis(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Header names are not valid property names; selectors would never see them.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }
}

fn owned_string(s: &Option<String>) -> Option<Cow<'_, Value>> {
    s.as_ref().map(|s| Cow::Owned(Value::String(s.clone())))
}

impl PropertySource for Message {
    fn property(&self, name: &str) -> Option<Cow<'_, Value>> {
        match name {
            JMS_DELIVERY_MODE => Some(Cow::Owned(Value::from(self.delivery_mode.as_str()))),
            JMS_PRIORITY => Some(Cow::Owned(Value::Integer(i64::from(self.priority)))),
            JMS_MESSAGE_ID => owned_string(&self.message_id),
            JMS_CORRELATION_ID => owned_string(&self.correlation_id),
            JMS_TYPE => owned_string(&self.jms_type),
            JMS_TIMESTAMP => self.timestamp.map(|t| Cow::Owned(Value::Integer(t))),
            _ => self.properties.get(name).map(Cow::Borrowed),
        }
    }
}
