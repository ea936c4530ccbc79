use crate::input::CenterTable;
use crate::warnings::Warning;
use funding_solver::{Allocation, FundingCap};
use std::path::Path;

pub fn render_allocation_report(
    input_path: &Path,
    table: &CenterTable,
    allocation: &Allocation,
    warnings: &[Warning],
) -> String {
    let params = &allocation.params;

    let mut md = String::new();
    md.push_str("# Funding allocation report\n\n");
    md.push_str(&format!("- Input: `{}`\n", input_path.display()));
    md.push_str(&format!("- Centers: `{}`\n", table.len()));
    md.push_str(&format!("- Status: `{}`\n\n", allocation.status.as_str()));

    md.push_str("## Parameters\n\n");
    md.push_str("| total_funding | base_funding | unincorporated_funding | global_cap | rate_max |\n");
    md.push_str("|---:|---:|---:|---:|---:|\n");
    md.push_str(&format!(
        "| `{:.2}` | `{:.2}` | `{:.2}` | `{}` | `{}` |\n\n",
        params.total_funding,
        params.base_funding,
        params.unincorporated_funding,
        cap_cell(params.global_cap),
        allocation.rate_max
    ));

    md.push_str("## Outcome\n\n");
    md.push_str("| per_person_rate | disbursed | gap | capped_centers | iterations |\n");
    md.push_str("|---:|---:|---:|---:|---:|\n");
    md.push_str(&format!(
        "| `{:.4}` | `{:.2}` | `{:.2}` | `{}` | `{}` |\n\n",
        allocation.rate,
        allocation.disbursed,
        allocation.gap,
        allocation.capped_count(),
        allocation.iterations
    ));

    if !warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for warning in warnings {
            md.push_str(&format!("- {}\n", truncate_one_line(&warning.message, 240)));
        }
        md.push('\n');
    }

    let has_history = table.past_funding.is_some();
    md.push_str("## Per-center comparison\n\n");
    if has_history {
        md.push_str("| # | program | people_served | past_funding | per_center_funding | change | cap |\n");
        md.push_str("|---:|---|---:|---:|---:|---:|---:|\n");
    } else {
        md.push_str("| # | program | people_served | per_center_funding | cap |\n");
        md.push_str("|---:|---|---:|---:|---:|\n");
    }
    for (idx, (recipient, row)) in table.recipients.iter().zip(&allocation.rows).enumerate() {
        let program = table
            .program_name(idx)
            .map(|name| escape_cell(&truncate_one_line(name, 60)))
            .unwrap_or_else(|| "n/a".to_string());
        let cap = if row.capped {
            format!("{} (binding)", cap_cell(row.effective_cap))
        } else {
            cap_cell(row.effective_cap)
        };
        if has_history {
            let past = table.past_funding_at(idx);
            md.push_str(&format!(
                "| {} | {} | `{}` | `{}` | `{:.2}` | `{}` | `{}` |\n",
                idx + 1,
                program,
                recipient.people_served,
                past.map_or("n/a".to_string(), |v| format!("{v:.2}")),
                row.per_center_funding,
                past.map_or("n/a".to_string(), |v| format!(
                    "{:+.2}",
                    row.per_center_funding - v
                )),
                cap
            ));
        } else {
            md.push_str(&format!(
                "| {} | {} | `{}` | `{:.2}` | `{}` |\n",
                idx + 1,
                program,
                recipient.people_served,
                row.per_center_funding,
                cap
            ));
        }
    }

    if let Some(historical) = table.historical_total() {
        md.push_str(&format!(
            "\nHistorical total: `{historical:.2}`; new total: `{:.2}`.\n",
            allocation.disbursed
        ));
    }

    md
}

fn cap_cell(cap: FundingCap) -> String {
    cap.limit()
        .map_or_else(|| "none".to_string(), |limit| format!("{limit:.2}"))
}

fn truncate_one_line(text: &str, max_chars: usize) -> String {
    let mut s = text.replace(['\n', '\r', '\t'], " ");
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= max_chars {
        return s;
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
