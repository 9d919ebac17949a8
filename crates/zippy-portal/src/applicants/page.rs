use std::fmt::{self, Write};

use super::router::dashboard_query;
use super::store::LoadError;
use super::summary::GroupKey;
use super::view::PortalView;

const PAGE_TITLE: &str = "Zippy Sales Portal";
const HEADING: &str = "Tax Credit Eligibility Finder";
const SUBHEADING: &str = "Search for candidates eligible for Empowerment Zone tax credits.";

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex}\
aside{width:18rem;padding:1rem;background:#f4f5f7;min-height:100vh}\
aside label{display:block;margin:.6rem 0}\
aside select,aside input[type=text]{width:100%}\
main{flex:1;padding:1rem 2rem;overflow-x:auto}\
.metrics{display:flex;gap:2rem}\
.metric .value{font-size:2rem;font-weight:600}\
.bar-row{display:flex;align-items:center;gap:.5rem;margin:.2rem 0}\
.bar-label{width:10rem;text-align:right}\
.bar{background:#4c78a8;height:1.1rem}\
table{border-collapse:collapse}\
td,th{border:1px solid #ddd;padding:.25rem .5rem}\
.error{background:#fde8e8;color:#9b1c1c;padding:1rem;border-radius:.3rem}";

/// Full dashboard: filter sidebar, metrics, grouped bar chart and table.
pub fn render_dashboard(view: &PortalView) -> String {
    let mut html = String::new();
    write_dashboard(&mut html, view).expect("writing to a String cannot fail");
    html
}

/// Shown instead of the whole dashboard when the dataset cannot be loaded.
pub fn render_load_error(error: &LoadError) -> String {
    let mut html = String::new();
    write_error(&mut html, error).expect("writing to a String cannot fail");
    html
}

fn write_head(html: &mut String) -> fmt::Result {
    writeln!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{PAGE_TITLE}</title><style>{STYLE}</style></head>\n<body>"
    )
}

fn write_error(html: &mut String, error: &LoadError) -> fmt::Result {
    write_head(html)?;
    writeln!(html, "<main><h1>{HEADING}</h1>")?;
    writeln!(
        html,
        "<div class=\"error\" role=\"alert\">Could not load applicant data: {}</div>",
        escape_html(&error.to_string())
    )?;
    writeln!(html, "</main></body></html>")
}

fn write_dashboard(html: &mut String, view: &PortalView) -> fmt::Result {
    write_head(html)?;
    write_sidebar(html, view)?;

    writeln!(html, "<main><h1>{HEADING}</h1><p>{SUBHEADING}</p>")?;
    let metrics = &view.metrics;
    writeln!(html, "<section class=\"metrics\">")?;
    for (label, value) in [
        ("Candidates Found", metrics.count),
        ("EZ Eligible", metrics.eligible_count),
        ("Unique NAICS Sectors", metrics.distinct_naics_count),
    ] {
        writeln!(
            html,
            "<div class=\"metric\"><div class=\"label\">{label}</div><div class=\"value\">{value}</div></div>"
        )?;
    }
    writeln!(html, "</section>")?;

    write_chart(html, view)?;
    write_table(html, view)?;

    writeln!(
        html,
        "<p><small>Loaded {} applicants at {}</small></p></main></body></html>",
        view.total_records,
        view.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn write_sidebar(html: &mut String, view: &PortalView) -> fmt::Result {
    let criteria = &view.criteria;
    writeln!(html, "<aside><h2>Search Filters</h2><form method=\"get\" action=\"/\">")?;

    write_multiselect(html, "State", "state", &view.options.states, |value| {
        criteria.states.contains(value)
    })?;
    writeln!(
        html,
        "<label>City (Type to search)<input type=\"text\" name=\"city\" value=\"{}\"></label>",
        escape_html(&criteria.city)
    )?;
    writeln!(
        html,
        "<label>Zip Code<input type=\"text\" name=\"zipcode\" value=\"{}\"></label>",
        escape_html(&criteria.zipcode)
    )?;
    write_multiselect(
        html,
        "NAICS Code",
        "naics_code",
        &view.options.naics_codes,
        |value| criteria.naics_codes.contains(value),
    )?;
    writeln!(
        html,
        "<label><input type=\"checkbox\" name=\"ez_only\"{}> Show only Empowerment Zone hits</label>",
        if criteria.ez_only { " checked" } else { "" }
    )?;

    writeln!(html, "<label>Group By<select name=\"group_by\">")?;
    for key in GroupKey::ordered() {
        writeln!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            key.as_param(),
            if key == view.group_by { " selected" } else { "" },
            key.label()
        )?;
    }
    writeln!(html, "</select></label>")?;
    writeln!(html, "<button type=\"submit\">Apply</button></form>")?;

    writeln!(
        html,
        "<h2>Controls</h2><form method=\"post\" action=\"/reload?{}\"><button type=\"submit\">Reload Data</button></form></aside>",
        escape_html(&dashboard_query(&view.criteria, view.group_by))
    )
}

fn write_multiselect(
    html: &mut String,
    label: &str,
    name: &str,
    options: &[String],
    selected: impl Fn(&str) -> bool,
) -> fmt::Result {
    writeln!(html, "<label>{label}<select name=\"{name}\" multiple>")?;
    for option in options {
        let escaped = escape_html(option);
        writeln!(
            html,
            "<option value=\"{escaped}\"{}>{escaped}</option>",
            if selected(option) { " selected" } else { "" }
        )?;
    }
    writeln!(html, "</select></label>")
}

fn write_chart(html: &mut String, view: &PortalView) -> fmt::Result {
    let summary = &view.summary;
    writeln!(
        html,
        "<h2>Grouped Summary</h2><section class=\"chart\" aria-label=\"Count by {}\">",
        summary.key_label
    )?;
    if summary.groups.is_empty() {
        writeln!(html, "<p>No candidates match the current filters.</p>")?;
    }
    let max = summary.max_count().max(1);
    for group in &summary.groups {
        let width = group.count * 100 / max;
        writeln!(
            html,
            "<div class=\"bar-row\"><span class=\"bar-label\">{}</span><span class=\"bar\" style=\"width:{width}%\"></span><span class=\"bar-count\">{}</span></div>",
            escape_html(&group.label),
            group.count
        )?;
    }
    writeln!(html, "</section>")
}

fn write_table(html: &mut String, view: &PortalView) -> fmt::Result {
    writeln!(html, "<h2>Candidate Details</h2><table><thead><tr>")?;
    for column in &view.columns {
        write!(html, "<th>{}</th>", escape_html(column))?;
    }
    writeln!(html, "</tr></thead><tbody>")?;
    for record in &view.records {
        write!(html, "<tr>")?;
        for column in &view.columns {
            write!(html, "<td>{}</td>", escape_html(record.field(column).unwrap_or("")))?;
        }
        writeln!(html, "</tr>")?;
    }
    writeln!(html, "</tbody></table>")
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
