//! Resolve which monitored person an event references.
//!
//! When several monitored people are mentioned in one message, the first one
//! in roster order wins.

use crate::event::MessageEvent;
use crate::roster::{MonitoredPerson, Roster};

/// First roster entry whose handle appears in the event's mentions.
pub fn classify<'a>(event: &MessageEvent, roster: &'a Roster) -> Option<&'a MonitoredPerson> {
    roster
        .people
        .iter()
        .find(|p| event.mentioned_ids.contains(&p.handle))
}

/// Every referenced roster entry, in roster order.
pub fn classify_all<'a>(event: &MessageEvent, roster: &'a Roster) -> Vec<&'a MonitoredPerson> {
    roster
        .people
        .iter()
        .filter(|p| event.mentioned_ids.contains(&p.handle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::AvailabilityWindow;
    use chrono::Utc;

    fn roster() -> Roster {
        let w = vec![AvailabilityWindow::new(540, 900).unwrap()];
        Roster::new(
            chrono_tz::UTC,
            vec![
                MonitoredPerson::new("a", "A", "100", w.clone()),
                MonitoredPerson::new("b", "B", "200", w),
            ],
        )
        .unwrap()
    }

    fn event(mentions: &[&str]) -> MessageEvent {
        MessageEvent {
            author_id: "u".to_string(),
            author_name: "alice".to_string(),
            is_from_bot: false,
            text: "hey".to_string(),
            mentioned_ids: mentions.iter().map(|s| s.to_string()).collect(),
            channel_label: None,
            channel_id: None,
            message_id: None,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn no_mention_no_person() {
        assert!(classify(&event(&["999"]), &roster()).is_none());
    }

    #[test]
    fn single_mention() {
        let r = roster();
        assert_eq!(classify(&event(&["200"]), &r).unwrap().key, "b");
    }

    #[test]
    fn first_in_roster_order_wins() {
        let r = roster();
        // mention order in the message does not matter
        let e = event(&["200", "100"]);
        assert_eq!(classify(&e, &r).unwrap().key, "a");
        let all: Vec<_> = classify_all(&e, &r).iter().map(|p| p.key.as_str()).collect();
        assert_eq!(all, vec!["a", "b"]);
    }
}
