//! Extracts transactions from a picture of a statement by way of an external vision model.

use crate::api::{ChatRequest, VisionExtractor};
use crate::error::ImportError;
use crate::model::{Amount, Transaction, TransactionType};
use crate::parser::tabular::parse_date;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

/// The instruction sent along with every image.
pub(crate) const PROMPT: &str = r#"Extract bank transactions from this image. Return ONLY a JSON array with objects containing:
"date" (YYYY-MM-DD), "description" (string), "amount" (float, absolute value), and "type" (string: "withdrawal" or "deposit").
Do not include markdown blocks like ```json or any other text."#;

/// Sends `image` to the extraction service and parses its reply.
///
/// This is all-or-nothing: either every extracted row is well formed and the result is a list of
/// `Pending` transactions, or the whole image fails.
///
/// # Errors
/// - Whatever `extractor` returns, e.g. `ImportError::Service` for a non-success status.
/// - `ImportError::EmptyResponse` if the reply has no choices.
/// - `ImportError::Decode` if the reply is not a JSON array of well-formed transactions.
pub async fn parse_image(
    extractor: &dyn VisionExtractor,
    image: &[u8],
    model: &str,
) -> Result<Vec<Transaction>, ImportError> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    let request = ChatRequest::with_image(
        model,
        PROMPT,
        format!("data:image/jpeg;base64,{encoded}"),
    );
    debug!("Extracting transactions from a {} byte image", image.len());

    let response = extractor.complete(&request).await?;
    let content = match response.choices.into_iter().next() {
        Some(choice) => choice.message.content,
        None => return Err(ImportError::EmptyResponse),
    };
    decode_reply(&content)
}

/// One element of the array the model is asked to produce. Every field is required.
#[derive(Debug, Deserialize)]
struct ExtractedRow {
    date: String,
    description: String,
    amount: Amount,
    #[serde(rename = "type")]
    r#type: String,
}

/// Validates the model's reply against the expected shape and converts it to transactions.
pub(crate) fn decode_reply(content: &str) -> Result<Vec<Transaction>, ImportError> {
    let decode_error = |reason: String| ImportError::Decode {
        reason,
        raw: content.to_string(),
    };

    let rows: Vec<ExtractedRow> =
        serde_json::from_str(content.trim()).map_err(|e| decode_error(e.to_string()))?;

    rows.into_iter()
        .enumerate()
        .map(|(ix, row)| {
            let raw_date = row.date.trim();
            let date = parse_date(raw_date).map_err(|e| {
                decode_error(format!("element {ix} has an invalid date {raw_date:?}: {e}"))
            })?;
            let r#type = TransactionType::new(&row.r#type);
            if r#type.as_str() != TransactionType::WITHDRAWAL
                && r#type.as_str() != TransactionType::DEPOSIT
            {
                return Err(decode_error(format!(
                    "element {ix} has an invalid type {:?}",
                    row.r#type
                )));
            }
            Ok(Transaction::new(
                date,
                row.description.trim(),
                row.amount,
                r#type,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatResponse, ContentPart, TestVision};
    use crate::model::Status;

    #[tokio::test]
    async fn test_parse_image() {
        let vision = TestVision::replying(
            r#"[{"date":"2023-11-15","description":"Coffee Shop","amount":4.50,"type":"withdrawal"}]"#,
        );

        let txs = parse_image(&vision, b"dummy image content", "gpt-4-vision-preview")
            .await
            .unwrap();

        assert_eq!(1, txs.len());
        assert_eq!("2023-11-15", txs[0].date());
        assert_eq!("Coffee Shop", txs[0].description());
        assert_eq!("4.50", txs[0].amount().to_string());
        assert_eq!("withdrawal", txs[0].r#type().as_str());
        assert_eq!(Status::Pending, txs[0].status());
    }

    #[tokio::test]
    async fn test_request_carries_prompt_model_and_image() {
        let vision = TestVision::replying("[]");
        parse_image(&vision, b"abc", "my-model").await.unwrap();

        let requests = vision.requests().await;
        assert_eq!(1, requests.len());
        let request = &requests[0];
        assert_eq!("my-model", request.model);
        assert_eq!("user", request.messages[0].role);
        match &request.messages[0].content[..] {
            [ContentPart::Text { text }, ContentPart::ImageUrl { image_url }] => {
                assert!(text.contains("Return ONLY a JSON array"));
                assert!(text.contains("Do not include markdown"));
                assert_eq!("data:image/jpeg;base64,YWJj", image_url.url);
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let vision = TestVision::new(vec![Ok(ChatResponse::default())]);
        let err = parse_image(&vision, b"img", "m").await.unwrap_err();
        assert!(matches!(err, ImportError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_service_error_passes_through() {
        let vision = TestVision::new(vec![Err(ImportError::Service {
            status: 401,
            body: String::from("bad key"),
        })]);
        let err = parse_image(&vision, b"img", "m").await.unwrap_err();
        assert!(matches!(err, ImportError::Service { status: 401, .. }));
    }

    #[test]
    fn test_decode_rejects_markdown_fences() {
        let reply = "```json\n[]\n```";
        match decode_reply(reply) {
            Err(ImportError::Decode { raw, .. }) => assert_eq!(reply, raw),
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        // an object rather than an array
        assert!(decode_reply(r#"{"date":"2023-11-15"}"#).is_err());
        // missing amount
        assert!(decode_reply(r#"[{"date":"2023-11-15","description":"x","type":"deposit"}]"#).is_err());
        // amount is not numeric
        assert!(decode_reply(
            r#"[{"date":"2023-11-15","description":"x","amount":"lots","type":"deposit"}]"#
        )
        .is_err());
    }

    #[test]
    fn test_decode_is_all_or_nothing() {
        let reply = r#"[
            {"date":"2023-11-15","description":"ok","amount":1,"type":"deposit"},
            {"date":"15/11/2023","description":"bad","amount":2,"type":"deposit"}
        ]"#;
        match decode_reply(reply) {
            Err(ImportError::Decode { reason, .. }) => {
                assert!(reason.contains("element 1"), "{reason}")
            }
            other => panic!("expected a decode error, got {other:?}"),
        }

        let reply = r#"[{"date":"2023-11-15","description":"x","amount":1,"type":"refund"}]"#;
        assert!(matches!(
            decode_reply(reply),
            Err(ImportError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_normalizes() {
        let reply = r#" [{"date":"2023-11-15","description":" Payroll ","amount":-1500,"type":"Deposit"}] "#;
        let txs = decode_reply(reply).unwrap();
        assert_eq!("Payroll", txs[0].description());
        assert_eq!("1500.00", txs[0].amount().to_string());
        assert_eq!("deposit", txs[0].r#type().as_str());
    }

    #[test]
    fn test_decode_pads_dates() {
        let reply = r#"[{"date":"2023-1-5","description":"Rent","amount":1500,"type":"withdrawal"}]"#;
        let txs = decode_reply(reply).unwrap();
        assert_eq!("2023-01-05", txs[0].date());
    }
}
