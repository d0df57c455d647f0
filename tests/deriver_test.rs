// tests/deriver_test.rs

use beup_result_core::{ErrorKind, Result, ResultError, Semester, SiteConfig, UrlDeriver};

#[tokio::test]
async fn test_known_registration_number() -> Result<()> {
    let deriver = UrlDeriver::default();

    let derivation = deriver.derive_detailed("22102107005", "IV")?;
    assert_eq!(derivation.batch_start_year, 2022);
    assert_eq!(derivation.semester.number(), 4);
    assert_eq!(derivation.academic_year_index, 1);
    assert_eq!(derivation.exam_year, 2024);
    assert_eq!(derivation.file_name, "ResultsBTech4thSem2024_B2022Pub.aspx");

    let locator = derivation.locator;
    assert_eq!(
        locator.base_path(),
        "https://results.beup.ac.in/ResultsBTech4thSem2024_B2022Pub.aspx"
    );
    assert_eq!(locator.semester_code(), "IV");
    assert_eq!(locator.registration_number(), "22102107005");
    assert_eq!(
        locator.effective_url(),
        "https://results.beup.ac.in/ResultsBTech4thSem2024_B2022Pub.aspx?Sem=IV&RegNo=22102107005"
    );

    println!("✅ Known registration number derives the expected page");
    Ok(())
}

#[tokio::test]
async fn test_filename_template_for_all_batches() -> Result<()> {
    let deriver = UrlDeriver::default();

    for prefix in 17..=29 {
        for semester in Semester::ALL {
            let reg = format!("{prefix}105107001");
            let locator = deriver.derive(&reg, semester.code())?;

            let batch = 2000 + prefix;
            let index = (semester.number() as i32 - 1) / 2;
            let year = if semester.number() % 2 == 1 {
                batch + index
            } else {
                batch + index + 1
            };
            let expected = format!(
                "https://results.beup.ac.in/ResultsBTech{}Sem{}_B20{}Pub.aspx",
                semester.ordinal(),
                year,
                prefix
            );
            assert_eq!(locator.base_path(), expected);
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_semester_tokens() -> Result<()> {
    let deriver = UrlDeriver::default();
    let expected = ["1st", "2nd", "3rd", "4th", "5th", "6th", "7th", "8th"];

    for (token, ordinal) in ["I", "II", "III", "IV", "V", "VI", "VII", "VIII"]
        .iter()
        .zip(expected)
    {
        let derivation = deriver.derive_detailed("21105107001", &token.to_lowercase())?;
        assert_eq!(derivation.semester.code(), *token);
        assert_eq!(derivation.semester.ordinal(), ordinal);
        assert_eq!(derivation.locator.semester_code(), *token);
    }

    for bad in ["IX", "0", "X", "IIII", "VV", "four", "I V"] {
        let err = deriver.derive("21105107001", bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{bad} should be rejected");
    }

    Ok(())
}

#[tokio::test]
async fn test_odd_and_even_exam_years() -> Result<()> {
    let deriver = UrlDeriver::default();

    assert!(deriver.derive("23000", "I")?.base_path().ends_with("ResultsBTech1stSem2023_B2023Pub.aspx"));
    assert!(deriver.derive("23000", "II")?.base_path().ends_with("ResultsBTech2ndSem2024_B2023Pub.aspx"));
    assert!(deriver.derive("23000", "VII")?.base_path().ends_with("ResultsBTech7thSem2026_B2023Pub.aspx"));
    assert!(deriver.derive("23000", "VIII")?.base_path().ends_with("ResultsBTech8thSem2027_B2023Pub.aspx"));

    Ok(())
}

#[tokio::test]
async fn test_invalid_registration_numbers() -> Result<()> {
    let deriver = UrlDeriver::default();

    let err = deriver.derive("5", "IV").unwrap_err();
    assert!(matches!(&err, ResultError::InvalidInput(msg) if msg.contains("too short to determine batch year")));

    for semester in ["I", "IX", "", "garbage"] {
        let err = deriver.derive("5", semester).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    assert_eq!(deriver.derive("", "IV").unwrap_err().kind(), ErrorKind::InvalidInput);
    assert_eq!(deriver.derive("AB12345", "IV").unwrap_err().kind(), ErrorKind::InvalidInput);
    assert!(!deriver.derive("AB12345", "IV").unwrap_err().is_retryable());

    Ok(())
}

#[tokio::test]
async fn test_configured_origin() -> Result<()> {
    let config = SiteConfig::default().with_origin("http://127.0.0.1:9000/");
    let locator = UrlDeriver::new(&config).derive("  22CS007 ", "vi")?;

    assert_eq!(
        locator.effective_url(),
        "http://127.0.0.1:9000/ResultsBTech6thSem2025_B2022Pub.aspx?Sem=VI&RegNo=22CS007"
    );

    Ok(())
}
