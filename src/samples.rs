//! Built-in sample CVs, used by `cvforge --demo` and the test suites.

use crate::document::{CvContent, CvDocument, EducationField, ExperienceField, PersonalField};

/// Names accepted by [`by_name`].
pub const NAMES: [&str; 3] = ["jane", "career", "minimal"];

pub fn by_name(name: &str) -> Option<CvContent> {
    match name {
        "jane" => Some(jane_doe()),
        "career" => Some(long_career()),
        "minimal" => Some(minimal()),
        _ => None,
    }
}

/// Jane Doe, a current engineer at Acme with two skills.
pub fn jane_doe() -> CvContent {
    let mut doc = CvDocument::new();
    doc.set_personal_info(PersonalField::FullName, "Jane Doe");
    doc.set_personal_info(PersonalField::Position, "Software Engineer");
    doc.set_personal_info(PersonalField::Email, "jane@example.com");
    doc.set_personal_info(PersonalField::Location, "Berlin");
    doc.set_summary("Engineer who enjoys building reliable systems.");

    let id = doc.add_work_experience();
    doc.update_work_experience(id, ExperienceField::Position, "Engineer");
    doc.update_work_experience(id, ExperienceField::Company, "Acme");
    doc.update_work_experience(id, ExperienceField::StartDate, "2020-01");
    doc.set_current_job(id, true);

    doc.set_education(EducationField::Institution, "State University");
    doc.set_education(EducationField::Major, "Computer Science");
    doc.set_education(EducationField::GraduationYear, "2019");
    doc.add_skill("Go");
    doc.add_skill("Rust");
    doc.content().clone()
}

/// A long history that cannot fit on one A4 page.
pub fn long_career() -> CvContent {
    let mut doc = CvDocument::new();
    doc.set_personal_info(PersonalField::FullName, "Alex Morgan Reyes");
    doc.set_personal_info(PersonalField::Position, "Principal Engineer");
    doc.set_personal_info(PersonalField::Email, "alex@example.com");
    doc.set_personal_info(PersonalField::Phone, "+1 555 0100");
    doc.set_personal_info(PersonalField::Linkedin, "linkedin.com/in/alexreyes");
    doc.set_summary(
        "Principal engineer with two decades of experience leading platform, \
         storage and developer-tooling teams through several generations of \
         infrastructure. Comfortable moving between architecture reviews and \
         hands-on debugging of production incidents.",
    );

    let companies = [
        "Northwind", "Globex", "Initech", "Umbrella", "Hooli", "Stark Industries",
        "Wayne Enterprises", "Tyrell", "Cyberdyne", "Soylent", "Wonka", "Aperture",
        "Black Mesa", "Vandelay", "Massive Dynamic", "Oscorp", "Gringotts", "Monarch",
    ];
    for (i, company) in companies.iter().enumerate() {
        let id = doc.add_work_experience();
        let start = 2024 - 2 * (i as i32 + 1);
        doc.update_work_experience(id, ExperienceField::Position, "Senior Engineer");
        doc.update_work_experience(id, ExperienceField::Company, *company);
        doc.update_work_experience(id, ExperienceField::StartDate, format!("{start}-03"));
        if i == 0 {
            doc.set_current_job(id, true);
        } else {
            doc.update_work_experience(id, ExperienceField::EndDate, format!("{}-02", start + 2));
        }
        doc.update_work_experience(
            id,
            ExperienceField::Description,
            format!(
                "Led the {company} platform group, owning service reliability, \
                 capacity planning and the migration of legacy batch jobs onto a \
                 streaming architecture. Mentored engineers and ran the on-call rotation."
            ),
        );
    }

    doc.set_education(EducationField::Institution, "Institute of Technology");
    doc.set_education(EducationField::Major, "Electrical Engineering");
    doc.set_education(EducationField::GraduationYear, "2003");
    doc.set_education(EducationField::Gpa, "3.8");
    for skill in ["Rust", "Go", "Distributed Systems", "Kubernetes", "PostgreSQL", "Kafka"] {
        doc.add_skill(skill);
    }
    doc.content().clone()
}

/// Name only.
pub fn minimal() -> CvContent {
    let mut doc = CvDocument::new();
    doc.set_personal_info(PersonalField::FullName, "Sam Lee");
    doc.content().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_sample_loads() {
        for name in NAMES {
            let content = by_name(name).unwrap();
            CvDocument::from_content(content).unwrap();
        }
        assert!(by_name("nobody").is_none());
    }
}
