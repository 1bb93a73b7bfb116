//! Translation tables. Every match is exhaustive so a new status or locale
//! cannot ship without wording.

use washcall_core::{MachineStatus, MachineType};

use crate::Locale;

/// Status label for a machine card.
pub fn status_text(status: MachineStatus, machine_type: MachineType, locale: Locale) -> &'static str {
    use MachineStatus as S;
    use MachineType as T;
    match (locale, status, machine_type) {
        (Locale::En, S::Off, _) => "Available",
        (Locale::En, S::Washing, _) => "Washing",
        (Locale::En, S::Spinning, _) => "Spinning",
        (Locale::En, S::Drying, _) => "Drying",
        (Locale::En, S::Finished, T::Washer) => "Wash complete",
        (Locale::En, S::Finished, T::Dryer) => "Dry complete",
        (Locale::Ko, S::Off, _) => "대기 중",
        (Locale::Ko, S::Washing, _) => "세탁 중",
        (Locale::Ko, S::Spinning, _) => "탈수 중",
        (Locale::Ko, S::Drying, _) => "건조 중",
        (Locale::Ko, S::Finished, T::Washer) => "세탁 완료",
        (Locale::Ko, S::Finished, T::Dryer) => "건조 완료",
    }
}

/// Fallback card title when the backend sent no name.
pub fn default_name(machine_type: MachineType, machine_id: u32, locale: Locale) -> String {
    match (locale, machine_type) {
        (Locale::En, MachineType::Washer) => format!("Washer {machine_id}"),
        (Locale::En, MachineType::Dryer) => format!("Dryer {machine_id}"),
        (Locale::Ko, MachineType::Washer) => format!("세탁기 {machine_id}번"),
        (Locale::Ko, MachineType::Dryer) => format!("건조기 {machine_id}번"),
    }
}

pub(crate) fn remaining_text(minutes: u32, locale: Locale) -> String {
    match locale {
        Locale::En => format!("{minutes} min left"),
        Locale::Ko => format!("{minutes}분 남음"),
    }
}

pub(crate) fn calculating(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "calculating…",
        Locale::Ko => "계산 중…",
    }
}

pub(crate) fn done(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "done",
        Locale::Ko => "완료",
    }
}

pub(crate) fn idle(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "idle",
        Locale::Ko => "대기 중",
    }
}

pub(crate) fn start_label(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Start course",
        Locale::Ko => "코스 시작",
    }
}

pub(crate) fn notify_label(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Notify me",
        Locale::Ko => "이 세탁기 알림 받기",
    }
}

pub(crate) fn registered_label(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Registered",
        Locale::Ko => "알림 등록됨",
    }
}

/// Alert shown when a `notify` message arrives.
pub fn notification_text(name: &str, status: MachineStatus, machine_type: MachineType, locale: Locale) -> String {
    let label = status_text(status, machine_type, locale);
    match locale {
        Locale::En => format!("{name}: {label}"),
        Locale::Ko => format!("{name}: {label}!"),
    }
}

/// Alert for a machine this session does not track. Its type is unknown, so
/// completion gets neutral wording.
pub fn untracked_notification_text(machine_id: u32, status: MachineStatus, locale: Locale) -> String {
    let label = match (locale, status) {
        (Locale::En, MachineStatus::Finished) => "Cycle complete",
        (Locale::Ko, MachineStatus::Finished) => "작동 완료",
        _ => status_text(status, MachineType::Washer, locale),
    };
    match locale {
        Locale::En => format!("Machine {machine_id}: {label}"),
        Locale::Ko => format!("{machine_id}번 기기: {label}!"),
    }
}

pub fn reservation_text(room_id: u32, reserved: bool, locale: Locale) -> String {
    match (locale, reserved) {
        (Locale::En, true) => format!("Room {room_id}: alerts on"),
        (Locale::En, false) => format!("Room {room_id}: alerts off"),
        (Locale::Ko, true) => format!("{room_id}번 세탁실 알림 구독 완료"),
        (Locale::Ko, false) => format!("{room_id}번 세탁실 알림 구독 해제"),
    }
}

pub fn no_tip_text(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "No congestion tip right now.",
        Locale::Ko => "지금은 혼잡도 팁이 없습니다.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Locale::En, MachineStatus::Finished, "Machine 55: Cycle complete")]
    #[case(Locale::Ko, MachineStatus::Finished, "55번 기기: 작동 완료!")]
    #[case(Locale::En, MachineStatus::Spinning, "Machine 55: Spinning")]
    fn untracked_alerts(#[case] locale: Locale, #[case] status: MachineStatus, #[case] expected: &str) {
        assert_eq!(untracked_notification_text(55, status, locale), expected);
    }

    #[test]
    fn reservation_wording() {
        assert_eq!(reservation_text(1, true, Locale::En), "Room 1: alerts on");
        assert_eq!(reservation_text(1, false, Locale::Ko), "1번 세탁실 알림 구독 해제");
    }
}
