//! Prompt for the career-coach feedback request

const CAREER_COACH_TEMPLATE: &str = r#"As an expert career coach, provide personalized feedback for a student based on their resume and a specific job description.
{missing_line}

Here is the Job Description:
---
{job}
---

Here is the Student's Resume:
---
{resume}
---

Provide constructive feedback in 3-4 concise bullet points. Focus on how the student can better highlight their existing experience or what specific projects or skills they should focus on acquiring to bridge the gap for this role.
Address the student directly in a positive and encouraging tone."#;

pub fn render_feedback_prompt(job_text: &str, resume_text: &str, missing_skills: &[String]) -> String {
    let missing_line = if missing_skills.is_empty() {
        "The student already lists every key skill the job asks for.".to_string()
    } else {
        format!(
            "The student is missing the following key skills required for the job: {}.",
            missing_skills.join(", ")
        )
    };

    CAREER_COACH_TEMPLATE
        .replace("{missing_line}", &missing_line)
        .replace("{job}", job_text.trim())
        .replace("{resume}", resume_text.trim())
}
