//! Prompt construction for the content operations.
//!
//! Each builder folds a copywriting system preamble and the request data
//! into a single prompt string. Prompts are deliberately plain text — the
//! provider wrapper decides how to frame them for its upstream API.

use super::{AboutRequest, HeadlineRequest, ProjectRequest};

pub(crate) fn about_prompt(req: &AboutRequest) -> String {
    let mut data = format!(
        "Data:\n- Name: {}\n- Skills: {}\n",
        req.name,
        req.skills.join(", ")
    );
    if let Some(years) = req.experience_years {
        data.push_str(&format!("- Experience: {years} years\n"));
    }
    if let Some(industry) = &req.industry {
        data.push_str(&format!("- Industry: {industry}\n"));
    }

    format!(
        "You are a professional copywriter specialising in portfolios and resumes.\n\n\
         {data}\n\
         Requirements:\n\
         1. Write in the first person\n\
         2. Three to four paragraphs\n\
         3. Professional but friendly tone\n\
         4. Emphasise what makes this person distinctive and driven\n\
         5. Avoid cliches like \"passionate specialist\"\n\
         6. Mention concrete achievements where the experience implies them\n\n\
         Return only the text, without headings or formatting."
    )
}

pub(crate) fn project_prompt(req: &ProjectRequest) -> String {
    let mut data = format!(
        "Data:\n- Project: {}\n- Technologies: {}\n",
        req.name,
        req.technologies.join(", ")
    );
    if let Some(brief) = &req.brief_description {
        data.push_str(&format!("- Brief description: {brief}\n"));
    }

    format!(
        "You are a technical writer creating project descriptions for developer portfolios.\n\n\
         {data}\n\
         Requirements:\n\
         1. Two to three paragraphs\n\
         2. Highlight the technical decisions and their results\n\
         3. Use the active voice\n\
         4. Avoid stating the obvious\n\
         5. Show the business value of the project\n\n\
         Return only the description, without headings."
    )
}

pub(crate) fn headline_prompt(req: &HeadlineRequest) -> String {
    let mut data = format!(
        "Data:\n- Name: {}\n- Skills: {}\n",
        req.name,
        req.skills.join(", ")
    );
    if let Some(industry) = &req.industry {
        data.push_str(&format!("- Industry: {industry}\n"));
    }

    format!(
        "You are a professional copywriter specialising in portfolios and resumes.\n\n\
         {data}\n\
         Requirements:\n\
         1. One sentence, at most twelve words\n\
         2. No buzzwords, no exclamation marks\n\
         3. Lead with what this person builds, not job titles\n\n\
         Return only the headline."
    )
}

pub(crate) fn skills_prompt(skills: &[String]) -> String {
    format!(
        "You are an expert at structuring technical skills. Always answer with valid JSON only.\n\n\
         Group the following skills into logical categories.\n\n\
         Skills: {}\n\n\
         Return the result STRICTLY as JSON:\n\
         {{\n  \"Frontend\": [\"React\", \"...\"],\n  \"Backend\": [\"FastAPI\", \"...\"],\n  \"Other\": [\"...\"]\n}}\n\n\
         Categories may include: Frontend, Backend, Database, DevOps, Design, Tools, Soft Skills, etc.\n\
         Return ONLY the JSON, no explanations.",
        skills.join(", ")
    )
}
