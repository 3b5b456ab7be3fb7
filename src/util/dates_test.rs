use super::*;
use crate::Error;

#[test]
fn test_parse_format_date() {
    let date = parse_date("20240505").unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 5).unwrap());
    assert_eq!(format_date(&date), "20240505");

    let date = NaiveDate::from_ymd_opt(999, 1, 2).unwrap();
    assert_eq!(format_date(&date), "09990102");
}

#[test]
fn test_parse_date_invalid() {
    for s in ["2024055", "202405050", "2024-5-5", "20241301", "20240230", ""].iter() {
        match parse_date(s) {
            Err(Error::InvalidFormat(_, _)) => (),
            res => panic!("{:?} {:?}", s, res),
        }
    }
}

#[test]
fn test_is_date_shaped() {
    assert!(is_date_shaped(b"20200101"));
    assert!(is_date_shaped(b"99999999"));
    assert!(!is_date_shaped(b"2020010"));
    assert!(!is_date_shaped(b"2020010a"));
}
