use airdex_core::CoordinateFormat;
use serde::Serialize;

use crate::cli::CoordArgs;
use crate::error::CliError;
use crate::output::EnvelopeError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CoordResponseData<'a> {
    input: &'a str,
    encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    degrees: Option<f64>,
}

pub fn run(args: &CoordArgs) -> Result<CommandResult, CliError> {
    let encoding = args.encoding.resolve(&args.text);
    let mut data = CoordResponseData {
        input: args.text.as_str(),
        encoding: encoding_name(encoding),
        axis: None,
        degrees: None,
    };

    match encoding.parse(&args.text) {
        Ok(angle) => {
            data.axis = Some(angle.axis().to_string());
            data.degrees = Some(angle.degrees());
            Ok(CommandResult::ok(serde_json::to_value(data)?))
        }
        Err(error) => {
            let failure = EnvelopeError::from_coordinate(args.text.as_str(), &error);
            Ok(CommandResult::ok(serde_json::to_value(data)?).with_errors(vec![failure]))
        }
    }
}

const fn encoding_name(format: CoordinateFormat) -> &'static str {
    match format {
        CoordinateFormat::ArcSeconds => "arc_seconds",
        CoordinateFormat::Dms => "dms",
    }
}
