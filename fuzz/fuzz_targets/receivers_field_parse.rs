#![no_main]

use libfuzzer_sys::fuzz_target;
use sms_dispatch::{
    parse_receivers_field, DispatchRequest, DispatchRequestLimits, Recipient,
    VALIDATION_REASON_BLANK_RECIPIENT, VALIDATION_REASON_RECEIVERS_MALFORMED,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    match parse_receivers_field(&raw) {
        Ok(receivers) => {
            for receiver in &receivers {
                match Recipient::parse(receiver) {
                    Ok(recipient) => {
                        assert!(!recipient.as_str().contains('-'));
                        if recipient.is_well_formed() {
                            assert!(recipient.as_str().bytes().all(|byte| byte.is_ascii_digit()));
                        }
                        assert_eq!(
                            recipient.masked().chars().count(),
                            recipient.as_str().chars().count()
                        );
                    }
                    Err(error) => {
                        assert_eq!(error.reason_code(), VALIDATION_REASON_BLANK_RECIPIENT);
                    }
                }
            }
            if let Ok(request) =
                DispatchRequest::new("fuzz", &receivers, None, DispatchRequestLimits::default())
            {
                assert_eq!(request.recipients().len(), receivers.len());
            }
        }
        Err(error) => {
            assert_eq!(error.reason_code(), VALIDATION_REASON_RECEIVERS_MALFORMED);
            assert!(error.is_client_error());
        }
    }
});
