//! Native stand-in for the compiled filter-response module used by the
//! documentation pages. It exercises all three result paths: the plot comes
//! back through the shared slot, the sampled curve through a callback and a
//! single response value as a direct return.

mod biquad;
mod plot;

pub use biquad::{Biquad, FilterParams, FilterType};
pub use plot::{FreqAxis, ResponsePlot};

use crate::{module::HeapRelay, ForeignModule, Result, Value, WasmPanelError};

const MEMBERS: [&str; 7] = [
    "_filterGraph",
    "_responseCurve",
    "_responseAt",
    "__heap_base",
    "__indirect_function_table",
    "memory",
    "HEAPF64",
];

/// Filter-response module with biquad designs and an SVG plotter.
#[derive(Debug, Default)]
pub struct FilterResponses {
    invocations: u64,
}

impl FilterResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory suitable for [`crate::WasmApi::load`].
    pub async fn instantiate() -> Result<Self> {
        tracing::debug!("instantiating filter response module");
        Ok(Self::new())
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    // filterGraph(width, height, type, freq, logFreq, octaves, db)
    fn filter_graph(&self, args: &[Value], heap: &mut HeapRelay<'_, '_>) -> Result<Option<Value>> {
        let width = number(args, 0, "width")?;
        let height = number(args, 1, "height")?;
        let params = filter_params(args, 2, 3, 5, 6)?;
        let axis = if flag(args, 4, "logFreq")? {
            FreqAxis::Log
        } else {
            FreqAxis::Linear
        };

        let filter = Biquad::design(params)?;
        let mut plot = ResponsePlot::new(width, height, axis);
        let points = plot.sample_points();
        if params.kind.uses_gain() {
            plot.line("gain", points.iter().map(|&freq| (freq, params.db)));
        }
        plot.line(
            "response",
            points.iter().map(|&freq| (freq, filter.response_db(freq))),
        );
        plot.marker(params.freq, filter.response_db(params.freq));

        heap.set_result(plot.to_svg());
        Ok(None)
    }

    // responseCurve(type, freq, octaves, db, points)
    fn response_curve(&self, args: &[Value], heap: &mut HeapRelay<'_, '_>) -> Result<Option<Value>> {
        let params = filter_params(args, 0, 1, 2, 3)?;
        let points = number(args, 4, "points")?;
        if points.fract() != 0.0 || points < 2.0 {
            return Err(WasmPanelError::msg(format!("points must be an integer of at least 2, got {points}")));
        }

        let curve = Biquad::design(params)?.response_curve(points as usize)?;
        heap.deliver(curve)?;
        Ok(None)
    }

    // responseAt(type, freq, octaves, db, at)
    fn response_at(&self, args: &[Value]) -> Result<Option<Value>> {
        let params = filter_params(args, 0, 1, 2, 3)?;
        let at = number(args, 4, "at")?;
        Ok(Some(Value::Number(Biquad::design(params)?.response_db(at))))
    }
}

impl ForeignModule for FilterResponses {
    fn member_names(&self) -> Vec<String> {
        MEMBERS.iter().map(|member| member.to_string()).collect()
    }

    fn invoke(&mut self, name: &str, args: &[Value], heap: &mut HeapRelay<'_, '_>) -> Result<Option<Value>> {
        self.invocations += 1;
        match name {
            "_filterGraph" => self.filter_graph(args, heap),
            "_responseCurve" => self.response_curve(args, heap),
            "_responseAt" => self.response_at(args),
            other => Err(WasmPanelError::msg(format!("`{other}` is not callable"))),
        }
    }
}

fn arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a Value> {
    args.get(index)
        .ok_or_else(|| WasmPanelError::msg(format!("missing argument {index} ({name})")))
}

fn number(args: &[Value], index: usize, name: &str) -> Result<f64> {
    let value = arg(args, index, name)?;
    value
        .as_f64()
        .ok_or_else(|| WasmPanelError::msg(format!("argument {index} ({name}) must be numeric, got {value}")))
}

fn flag(args: &[Value], index: usize, name: &str) -> Result<bool> {
    let value = arg(args, index, name)?;
    value
        .as_bool()
        .ok_or_else(|| WasmPanelError::msg(format!("argument {index} ({name}) must be a flag, got {value}")))
}

fn filter_params(args: &[Value], kind: usize, freq: usize, octaves: usize, db: usize) -> Result<FilterParams> {
    Ok(FilterParams {
        kind: FilterType::from_value(arg(args, kind, "type")?)?,
        freq: number(args, freq, "freq")?,
        octaves: number(args, octaves, "octaves")?,
        db: number(args, db, "db")?,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{Arg, WasmApi};

    fn api() -> WasmApi<FilterResponses> {
        pollster::block_on(WasmApi::load(FilterResponses::instantiate)).unwrap()
    }

    #[test]
    fn exposes_only_public_exports() {
        let names: Vec<_> = api().names().map(str::to_string).collect();
        assert_eq!(names, vec!["filterGraph", "responseAt", "responseCurve"]);
    }

    #[test]
    fn filter_graph_returns_svg_through_the_slot() {
        let api = api();
        let svg = api
            .call(
                "filterGraph",
                [
                    Arg::from(300.0),
                    Arg::from(150.0),
                    Arg::from("peak"),
                    Arg::from(0.1),
                    Arg::from(true),
                    Arg::from(1.0),
                    Arg::from(6.0),
                ],
            )
            .unwrap()
            .expect("plot should be published");

        let svg = svg.as_str().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"class="gain""#));
        assert!(svg.contains(r#"class="response""#));
        assert_eq!(api.pending_heap_result(), None);
    }

    #[test]
    fn response_curve_arrives_via_callback() {
        let api = api();
        let curve = RefCell::new(None);
        let returned = api
            .call(
                "responseCurve",
                [
                    Arg::from(0),
                    Arg::from(0.1),
                    Arg::from(1.0),
                    Arg::from(0.0),
                    Arg::from(65),
                    Arg::callback(|value| *curve.borrow_mut() = Some(value)),
                ],
            )
            .unwrap();

        assert_eq!(returned, None);
        let curve = curve.into_inner().unwrap();
        let curve = curve.as_array().unwrap();
        assert_eq!(curve.type_code(), "F64");
        assert_eq!(curve.len(), 65);
        assert!(curve.to_f64_vec()[0].abs() < 1e-6);
    }

    #[test]
    fn response_curve_without_callback_fails_in_the_module() {
        let err = api()
            .call(
                "responseCurve",
                [Arg::from(0), Arg::from(0.1), Arg::from(1.0), Arg::from(0.0), Arg::from(65)],
            )
            .unwrap_err();
        assert!(matches!(err, WasmPanelError::NoCallbackRegistered));
    }

    #[test]
    fn response_at_returns_directly() {
        let api = api();
        let db = api
            .call(
                "responseAt",
                [Arg::from("peak"), Arg::from(0.2), Arg::from(2.0), Arg::from(-12.0), Arg::from(0.2)],
            )
            .unwrap()
            .and_then(|value| value.as_f64())
            .unwrap();
        assert!((db + 12.0).abs() < 1e-6);
        assert_eq!(api.into_module().invocations(), 1);
    }

    #[test]
    fn bad_arguments_are_reported() {
        let err = api()
            .call("responseAt", [Arg::from("peak"), Arg::from(0.2)])
            .unwrap_err();
        assert!(err.to_string().contains("missing argument 2"));
    }
}
