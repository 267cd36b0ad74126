use proptest::prelude::*;
use sheetplan_common::{CellValue, column_letters};
use sheetplan_engine::executor::impact::delete_rows_descending;
use sheetplan_engine::{Header, resolve_column};
use sheetplan_testkit::{int, sheet};
use sheetplan_workbook::TabularStore;

proptest! {
    #[test]
    fn letter_shaped_identifiers_win_over_header_names(id in "[A-Za-z]{1,2}", at in 1u32..40) {
        let mut headers: Vec<Header> = (1..=40).map(|i| Header::new(format!("Field {i}"), i)).collect();
        headers[(at - 1) as usize].name = id.clone();
        prop_assert_eq!(resolve_column(&id, &headers), id.to_ascii_uppercase());
    }

    #[test]
    fn header_names_resolve_to_their_letter(at in 1u32..200) {
        let headers: Vec<Header> = (1..=200).map(|i| Header::new(format!("Metric {i}"), i)).collect();
        let name = format!("metric {at}");
        prop_assert_eq!(resolve_column(&name, &headers), column_letters(at));
    }

    #[test]
    fn descending_delete_leaves_the_complement(flags in prop::collection::vec(any::<bool>(), 0..30)) {
        let rows: Vec<Vec<CellValue>> = (0..flags.len()).map(|i| vec![int(i as i64)]).collect();
        let mut store = sheet("Ids", &["Id"], rows);
        let targets: Vec<u32> = flags
            .iter()
            .enumerate()
            .filter(|(_, del)| **del)
            .map(|(i, _)| i as u32 + 2)
            .collect();
        // Feed the targets in ascending order; the helper must still go bottom-up.
        let deleted = delete_rows_descending(&mut store, &targets).unwrap();
        prop_assert_eq!(deleted, targets.len());

        let expected: Vec<CellValue> = flags
            .iter()
            .enumerate()
            .filter(|(_, del)| !**del)
            .map(|(i, _)| int(i as i64))
            .collect();
        let remaining: Vec<CellValue> = if store.last_row() < 2 {
            Vec::new()
        } else {
            store
                .read_rows(2, store.last_row())
                .unwrap()
                .into_iter()
                .map(|mut r| r.remove(0))
                .collect()
        };
        prop_assert_eq!(remaining, expected);
    }
}
