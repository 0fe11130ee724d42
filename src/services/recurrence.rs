//! recurrence.rs
//!
//! Разворачивание повторяющихся событий в конкретные даты календаря.
//!
//! Чистая логика без обращений к БД: (начало, конец, дни недели) ->
//! упорядоченный список дат. Таймзоны не учитываются - все даты
//! локальные календарные (NaiveDate).

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;
use uuid::Uuid;

// Коды дней недели, как их присылает клиент
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code {
        "sun" => Some(Weekday::Sun),
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        _ => None,
    }
}

pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sun",
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
    }
}

/// Перебирает каждый день диапазона включительно и оставляет даты,
/// чей день недели входит в набор. Линейно по длине диапазона -
/// приемлемо, клиенты ограничивают диапазон парой месяцев.
///
/// Пустой результат - ответственность вызывающего: он обязан
/// превратить его в ошибку валидации и ничего не создавать.
pub fn expand(start: NaiveDate, end: NaiveDate, weekdays: &HashSet<Weekday>) -> Vec<NaiveDate> {
    if weekdays.is_empty() || start > end {
        return Vec::new();
    }

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| weekdays.contains(&d.weekday()))
        .collect()
}

// Идентификатор группы генерируется один раз на успешное разворачивание
// и проставляется каждой созданной строке
pub fn new_group_id() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn mondays_and_wednesdays_in_june() {
        let days: HashSet<Weekday> = [Weekday::Mon, Weekday::Wed].into_iter().collect();
        let got = expand(d("2024-06-03"), d("2024-06-17"), &days);
        let want = vec![
            d("2024-06-03"),
            d("2024-06-05"),
            d("2024-06-10"),
            d("2024-06-12"),
            d("2024-06-17"),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn range_shorter_than_week_can_miss_all_weekdays() {
        // 2024-06-04 (вт) .. 2024-06-06 (чт), ищем только субботы
        let days: HashSet<Weekday> = [Weekday::Sat].into_iter().collect();
        assert!(expand(d("2024-06-04"), d("2024-06-06"), &days).is_empty());
    }

    #[test]
    fn empty_weekday_set_yields_nothing() {
        let days = HashSet::new();
        assert!(expand(d("2024-06-03"), d("2024-08-03"), &days).is_empty());
    }

    #[test]
    fn inverted_range_yields_nothing() {
        let days: HashSet<Weekday> = [Weekday::Mon].into_iter().collect();
        assert!(expand(d("2024-06-17"), d("2024-06-03"), &days).is_empty());
    }

    #[test]
    fn single_day_range_matches_itself() {
        // 2024-06-03 - понедельник
        let days: HashSet<Weekday> = [Weekday::Mon].into_iter().collect();
        assert_eq!(expand(d("2024-06-03"), d("2024-06-03"), &days), vec![d("2024-06-03")]);
    }

    #[test]
    fn weekday_codes_round_trip() {
        for code in ["sun", "mon", "tue", "wed", "thu", "fri", "sat"] {
            let day = weekday_from_code(code).unwrap();
            assert_eq!(weekday_code(day), code);
        }
        assert!(weekday_from_code("monday").is_none());
    }

    #[test]
    fn group_ids_do_not_collide_trivially() {
        assert_ne!(new_group_id(), new_group_id());
    }

    proptest! {
        // Каждая дата результата: в диапазоне, нужный день недели,
        // строго по возрастанию
        #[test]
        fn expansion_is_sorted_bounded_and_filtered(
            start_off in 0i64..3650,
            span in 0i64..120,
            mask in 1u8..128,
        ) {
            let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            let start = base + chrono::Duration::days(start_off);
            let end = start + chrono::Duration::days(span);

            let all = [
                Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed,
                Weekday::Thu, Weekday::Fri, Weekday::Sat,
            ];
            let days: HashSet<Weekday> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, d)| *d)
                .collect();

            let got = expand(start, end, &days);

            for pair in got.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for date in &got {
                prop_assert!(*date >= start && *date <= end);
                prop_assert!(days.contains(&date.weekday()));
            }

            // Диапазон в неделю и длиннее покрывает все дни недели
            if span >= 6 {
                prop_assert!(!got.is_empty());
            }
        }
    }
}
