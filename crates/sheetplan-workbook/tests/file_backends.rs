use std::fs;

use sheetplan_workbook::{
    CellRef, CellValue, ChartOptions, ChartSpec, CsvReadOptions, MemorySheet, RangeAddress,
    TabularStore,
};

#[test]
fn json_file_round_trip_keeps_charts_and_formats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.json");

    let mut sheet = MemorySheet::from_rows(
        "Sales",
        vec![
            vec![CellValue::from("Month"), "Revenue".into()],
            vec!["Jan".into(), CellValue::Int(100)],
            vec!["Feb".into(), CellValue::Int(150)],
        ],
    );
    sheet
        .set_number_format(RangeAddress::column(2, 2, 3).unwrap(), "$#,##0.00")
        .unwrap();
    sheet
        .create_chart(ChartSpec {
            chart_type: "line".into(),
            title: Some("Revenue".into()),
            domain: RangeAddress::column(1, 1, 3).unwrap(),
            series: vec![RangeAddress::column(2, 1, 3).unwrap()],
            anchor: CellRef { row: 1, col: 4 },
            options: ChartOptions::default(),
        })
        .unwrap();

    sheet.write_json(fs::File::create(&path).unwrap()).unwrap();
    let loaded = MemorySheet::load_json_path(&path).unwrap();

    assert_eq!(loaded.sheet_name(), "Sales");
    assert_eq!(loaded.values(), sheet.values());
    assert_eq!(loaded.charts(), sheet.charts());
    assert_eq!(loaded.number_format(3, 2), Some("$#,##0.00"));
}

#[test]
fn csv_file_is_named_after_its_stem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("regions.csv");
    fs::write(&path, "Region\tSales\nNorth\t10\n").unwrap();

    let options = CsvReadOptions {
        delimiter: b'\t',
        ..Default::default()
    };
    let sheet = MemorySheet::load_csv_path(&path, &options).unwrap();
    assert_eq!(sheet.sheet_name(), "regions");
    assert_eq!(
        sheet.read_cell(CellRef { row: 2, col: 2 }).unwrap(),
        CellValue::Int(10)
    );
}

#[test]
fn bottom_up_row_deletion_removes_the_intended_rows() {
    let mut sheet = MemorySheet::from_rows(
        "s",
        (1..=6).map(|i| vec![CellValue::Int(i)]).collect::<Vec<_>>(),
    );
    for row in [5, 3, 2] {
        sheet.delete_row(row).unwrap();
    }
    let left: Vec<_> = sheet.values().into_iter().map(|r| r[0].clone()).collect();
    assert_eq!(
        left,
        vec![CellValue::Int(1), CellValue::Int(4), CellValue::Int(6)]
    );
}
