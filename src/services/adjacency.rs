use crate::models::SeatPosition;

/// Стоят ли места подряд в одном ряду.
///
/// Пустой набор и одно место считаются смежными. Места из разных рядов или
/// с пропуском в номерах колонок - нет.
pub fn is_adjacent<S: SeatPosition>(seats: &[S]) -> bool {
    let Some(first) = seats.first() else {
        return true;
    };
    if seats.iter().any(|s| s.row() != first.row()) {
        return false;
    }

    let mut columns: Vec<i64> = seats.iter().map(|s| i64::from(s.column())).collect();
    columns.sort_unstable();
    columns.windows(2).all(|pair| pair[1] - pair[0] == 1)
}
